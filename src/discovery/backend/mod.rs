//! 服务发现后端抽象和实现

pub mod consul;
pub mod memory;

pub use consul::ConsulBackend;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use std::time::Duration;

use crate::discovery::instance::ServiceInstance;
use crate::error::Result;

/// 一次查询的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// 满足条件的实例
    pub instances: Vec<ServiceInstance>,

    /// 注册中心的数据版本号（Consul 的 `X-Consul-Index`）
    ///
    /// 下一次阻塞查询携带该值，注册中心在数据变化或等待超时后才返回
    pub index: u64,
}

/// 实例查询参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceQuery {
    pub service: String,
    pub tags: Vec<String>,
    pub passing_only: bool,
}

impl InstanceQuery {
    pub fn new(service: impl Into<String>, tags: Vec<String>, passing_only: bool) -> Self {
        Self {
            service: service.into(),
            tags,
            passing_only,
        }
    }
}

/// 服务发现后端 trait
///
/// 所有服务发现后端（Consul、内存）都需要实现这个 trait
/// 注意：由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    /// 查询服务实例
    ///
    /// # 参数
    /// * `query` - 服务名、必须全部匹配的标签、是否只返回健康实例
    /// * `wait_index` - 阻塞查询的版本号；`0` 表示立即返回
    /// * `wait` - 阻塞查询的最长等待时间
    ///
    /// # 返回
    /// 实例列表（顺序无关）和当前版本号
    async fn query(
        &self,
        query: &InstanceQuery,
        wait_index: u64,
        wait: Duration,
    ) -> Result<QueryResult>;
}
