use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::InfraResult;

/// 客户端配置
///
/// TOML 示例：
///
/// ```toml
/// consul_addr = "consul.internal:8500"
/// service = "skipper"
/// tags = ["prod"]
/// passing_only = true
/// retry_max = 3
/// retry_timeout_ms = 500
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Consul agent 地址（`host:port` 或完整 URL）
    pub consul_addr: String,
    pub service: String,
    /// 实例必须同时带有的标签
    pub tags: Vec<String>,
    /// 只使用健康检查全部通过的实例
    pub passing_only: bool,
    /// 每次调用的最大尝试次数
    pub retry_max: usize,
    /// 每次调用的总时间预算
    #[serde(rename = "retry_timeout_ms", with = "duration_ms")]
    pub retry_timeout: Duration,
    /// 是否对 POST 类非幂等操作重试（为 false 时只尝试一次）
    pub retry_non_idempotent: bool,
    /// 注册中心阻塞查询的最长等待时间
    #[serde(rename = "watch_wait_ms", with = "duration_ms")]
    pub watch_wait: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            consul_addr: "localhost:8500".to_string(),
            service: "skipper".to_string(),
            tags: vec!["prod".to_string()],
            passing_only: true,
            retry_max: 3,
            retry_timeout: Duration::from_millis(500),
            retry_non_idempotent: true,
            watch_wait: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    pub fn with_consul_addr(mut self, addr: impl Into<String>) -> Self {
        self.consul_addr = addr.into();
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_retry(mut self, max: usize, timeout: Duration) -> Self {
        self.retry_max = max;
        self.retry_timeout = timeout;
        self
    }

    pub fn with_retry_non_idempotent(mut self, enable: bool) -> Self {
        self.retry_non_idempotent = enable;
        self
    }

    pub fn with_watch_wait(mut self, wait: Duration) -> Self {
        self.watch_wait = wait;
        self
    }

    /// 从 TOML 文本解析，缺省字段取默认值
    pub fn from_toml(content: &str) -> InfraResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> InfraResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        Self::from_toml(&content)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
