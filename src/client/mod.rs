//! 客户端装配
//!
//! 一个共享的实例监听器；每个操作各自一条调用链：
//!
//! ```text
//! Instancer ─┬─ Endpointer(PostProfile) → RoundRobin → Retry ─┐
//!            ├─ Endpointer(GetProfile)  → RoundRobin → Retry ─┼─ Endpoints (ProfileService)
//!            └─ ...                                           ┘
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub use crate::config::ClientConfig;
use crate::discovery::{ConsulBackend, DiscoveryBackend, Endpointer, InstanceQuery, Instancer, InstancerConfig};
use crate::endpoint::{Endpoint, Factory, FactoryOutput, Operation, Request, make_endpoint};
use crate::error::{Result, SkipperError};
use crate::lb::{RoundRobin, Retry};
use crate::service::{Address, Profile, ProfileService};
use crate::transport::http::HttpClient;

/// 操作 → 端点 的映射，对外表现为一个 `ProfileService`
#[derive(Clone)]
pub struct Endpoints {
    inner: Arc<HashMap<Operation, Arc<dyn Endpoint>>>,
}

impl Endpoints {
    pub fn new(map: HashMap<Operation, Arc<dyn Endpoint>>) -> Self {
        Self {
            inner: Arc::new(map),
        }
    }

    pub fn get(&self, operation: Operation) -> Option<Arc<dyn Endpoint>> {
        self.inner.get(&operation).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    async fn call(&self, request: Request) -> Result<crate::endpoint::Response> {
        let operation = request.operation();
        let endpoint = self
            .inner
            .get(&operation)
            .ok_or_else(|| SkipperError::Internal(format!("no endpoint for {}", operation)))?;
        endpoint.call(request).await
    }
}

impl std::fmt::Debug for Endpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ops: Vec<&str> = self.inner.keys().map(|op| op.name()).collect();
        ops.sort_unstable();
        f.debug_struct("Endpoints").field("operations", &ops).finish()
    }
}

#[async_trait]
impl ProfileService for Endpoints {
    async fn post_profile(&self, profile: Profile) -> Result<()> {
        self.call(Request::PostProfile { profile }).await?.into_empty()
    }

    async fn get_profile(&self, id: &str) -> Result<Profile> {
        self.call(Request::GetProfile { id: id.to_string() })
            .await?
            .into_profile()
    }

    async fn put_profile(&self, id: &str, profile: Profile) -> Result<()> {
        self.call(Request::PutProfile {
            id: id.to_string(),
            profile,
        })
        .await?
        .into_empty()
    }

    async fn patch_profile(&self, id: &str, profile: Profile) -> Result<()> {
        self.call(Request::PatchProfile {
            id: id.to_string(),
            profile,
        })
        .await?
        .into_empty()
    }

    async fn delete_profile(&self, id: &str) -> Result<()> {
        self.call(Request::DeleteProfile { id: id.to_string() })
            .await?
            .into_empty()
    }

    async fn get_addresses(&self, profile_id: &str) -> Result<Vec<Address>> {
        self.call(Request::GetAddresses {
            profile_id: profile_id.to_string(),
        })
        .await?
        .into_addresses()
    }

    async fn get_address(&self, profile_id: &str, address_id: &str) -> Result<Address> {
        self.call(Request::GetAddress {
            profile_id: profile_id.to_string(),
            address_id: address_id.to_string(),
        })
        .await?
        .into_address()
    }

    async fn post_address(&self, profile_id: &str, address: Address) -> Result<()> {
        self.call(Request::PostAddress {
            profile_id: profile_id.to_string(),
            address,
        })
        .await?
        .into_empty()
    }

    async fn delete_address(&self, profile_id: &str, address_id: &str) -> Result<()> {
        self.call(Request::DeleteAddress {
            profile_id: profile_id.to_string(),
            address_id: address_id.to_string(),
        })
        .await?
        .into_empty()
    }
}

/// 默认端点工厂：实例地址 → HTTP 客户端 → 该操作的端点
pub fn factory_for(operation: Operation) -> Arc<dyn Factory> {
    factory_with_client(operation, reqwest::Client::new())
}

/// 与 [`factory_for`] 相同，但所有实例共用同一个连接池
pub fn factory_with_client(operation: Operation, http: reqwest::Client) -> Arc<dyn Factory> {
    Arc::new(move |instance: &str| -> Result<FactoryOutput> {
        let client = HttpClient::with_client(http.clone(), instance)?;
        Ok((make_endpoint(operation, client), None))
    })
}

/// 服务发现驱动、负载均衡、带重试的资料服务客户端
pub struct Client {
    instancer: Instancer,
    endpointers: Vec<Arc<Endpointer>>,
    endpoints: Endpoints,
}

impl Client {
    /// 连接 `config.consul_addr` 上的 Consul，使用默认 HTTP 端点工厂
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let backend = ConsulBackend::new(&config.consul_addr)?;
        let http = reqwest::Client::new();
        Self::with_backend(Arc::new(backend), config, move |op| {
            factory_with_client(op, http.clone())
        })
        .await
    }

    /// 使用任意注册中心后端和端点工厂构建
    ///
    /// 首次查询注册中心失败时返回错误
    pub async fn with_backend<F>(
        backend: Arc<dyn DiscoveryBackend>,
        config: ClientConfig,
        factory_fn: F,
    ) -> Result<Self>
    where
        F: Fn(Operation) -> Arc<dyn Factory>,
    {
        let query = InstanceQuery::new(
            config.service.clone(),
            config.tags.clone(),
            config.passing_only,
        );
        let instancer = Instancer::with_config(
            backend,
            query,
            InstancerConfig::default().with_wait(config.watch_wait),
        )
        .await?;

        let mut endpointers = Vec::with_capacity(Operation::ALL.len());
        let mut map: HashMap<Operation, Arc<dyn Endpoint>> = HashMap::new();

        for op in Operation::ALL {
            let endpointer = Arc::new(Endpointer::new(op.name(), &instancer, factory_fn(op)));
            let balancer = RoundRobin::new(endpointer.clone());

            let max = if op.is_idempotent() || config.retry_non_idempotent {
                config.retry_max
            } else {
                1
            };
            let retry = Retry::new(max, config.retry_timeout, balancer);

            map.insert(op, Arc::new(retry));
            endpointers.push(endpointer);
        }

        info!(
            service = %config.service,
            tags = ?config.tags,
            retry_max = config.retry_max,
            retry_timeout_ms = config.retry_timeout.as_millis() as u64,
            "Client assembled"
        );

        Ok(Self {
            instancer,
            endpointers,
            endpoints: Endpoints::new(map),
        })
    }

    /// 客户端调用入口
    pub fn endpoints(&self) -> Endpoints {
        self.endpoints.clone()
    }

    pub fn instancer(&self) -> &Instancer {
        &self.instancer
    }

    /// 关闭所有 Endpointer 并停止实例监听
    pub async fn shutdown(&self) {
        futures::future::join_all(self.endpointers.iter().map(|e| e.close())).await;
        self.instancer.stop().await;
        info!(service = %self.instancer.query().service, "Client shut down");
    }
}
