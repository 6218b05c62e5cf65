//! Consul 服务发现后端
//!
//! 通过 `GET /v1/health/service/:service` 查询实例，支持 Consul 阻塞查询
//! （`index` + `wait` 参数，应答头 `X-Consul-Index`）。
//! Consul 的 `tag` 参数只接受一个标签，其余标签在客户端过滤。

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{DiscoveryBackend, InstanceQuery, QueryResult};
use crate::discovery::instance::ServiceInstance;
use crate::error::{Result, SkipperError};

const CONSUL_INDEX_HEADER: &str = "X-Consul-Index";

/// Consul 服务发现后端
#[derive(Clone)]
pub struct ConsulBackend {
    http_client: HttpClient,
    consul_url: String,
    base: reqwest::Url,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    #[serde(rename = "Node")]
    node: NodeDetail,
    #[serde(rename = "Service")]
    service: ServiceDetail,
    #[serde(rename = "Checks", default)]
    checks: Vec<CheckDetail>,
}

#[derive(Debug, Deserialize)]
struct NodeDetail {
    #[serde(rename = "Address", default)]
    address: String,
}

#[derive(Debug, Deserialize)]
struct ServiceDetail {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Service", default)]
    service: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Tags", default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CheckDetail {
    #[serde(rename = "Status")]
    status: String,
}

impl ConsulBackend {
    /// 创建新的 Consul 后端
    ///
    /// `address` 可以是 `host:port`（默认 http）或完整的 URL
    pub fn new(address: &str) -> Result<Self> {
        let consul_url = if address.contains("://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address.trim_end_matches('/'))
        };

        let base = reqwest::Url::parse(&consul_url).map_err(|e| {
            SkipperError::discovery(format!("invalid consul address {}: {}", address, e))
        })?;

        Ok(Self {
            http_client: HttpClient::new(),
            consul_url,
            base,
        })
    }

    pub fn url(&self) -> &str {
        &self.consul_url
    }

    /// 服务名作为单独的路径段转义
    fn health_url(&self, service: &str) -> Result<reqwest::Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                SkipperError::discovery(format!("invalid consul address {}", self.consul_url))
            })?
            .pop_if_empty()
            .extend(["v1", "health", "service", service]);
        Ok(url)
    }

    fn to_instance(entry: ServiceEntry) -> ServiceInstance {
        // 服务未单独声明地址时使用节点地址
        let host = if entry.service.address.is_empty() {
            entry.node.address
        } else {
            entry.service.address
        };
        let address = format!("{}:{}", host, entry.service.port);
        let instance_id = if entry.service.id.is_empty() {
            address.clone()
        } else {
            entry.service.id
        };

        let healthy = entry.checks.iter().all(|c| c.status == "passing");

        ServiceInstance {
            service: entry.service.service,
            instance_id,
            address,
            tags: entry.service.tags.unwrap_or_default(),
            healthy,
        }
    }
}

#[async_trait]
impl DiscoveryBackend for ConsulBackend {
    async fn query(
        &self,
        query: &InstanceQuery,
        wait_index: u64,
        wait: Duration,
    ) -> Result<QueryResult> {
        let url = self.health_url(&query.service)?;

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(tag) = query.tags.first() {
            params.push(("tag", tag.clone()));
        }
        if query.passing_only {
            params.push(("passing", "true".to_string()));
        }
        if wait_index > 0 {
            params.push(("index", wait_index.to_string()));
            params.push(("wait", format!("{}ms", wait.as_millis())));
        }

        // Consul 会在 wait 基础上最多再加 wait/16 的随机抖动
        let request_timeout = wait + wait / 16 + Duration::from_secs(5);

        let resp = self
            .http_client
            .get(url)
            .query(&params)
            .timeout(request_timeout)
            .send()
            .await
            .map_err(|e| SkipperError::discovery(format!("consul request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SkipperError::discovery(format!(
                "consul returned {}: {}",
                status, body
            )));
        }

        let index = resp
            .headers()
            .get(CONSUL_INDEX_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        let entries: Vec<ServiceEntry> = resp
            .json()
            .await
            .map_err(|e| SkipperError::discovery(format!("invalid consul response: {}", e)))?;

        let instances: Vec<ServiceInstance> = entries
            .into_iter()
            .map(Self::to_instance)
            .filter(|inst| inst.matches_tags(&query.tags))
            .filter(|inst| !query.passing_only || inst.healthy)
            .collect();

        debug!(
            service = %query.service,
            index,
            count = instances.len(),
            "Consul query completed"
        );

        Ok(QueryResult { instances, index })
    }
}
