//! 内存服务发现后端（用于测试和本地开发）
//!
//! 语义与 Consul 阻塞查询一致：每次变更递增版本号，
//! 携带旧版本号的查询在版本号前进或等待超时后返回。

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};

use super::{DiscoveryBackend, InstanceQuery, QueryResult};
use crate::discovery::instance::ServiceInstance;
use crate::error::{Result, SkipperError};

#[derive(Default)]
struct State {
    instances: HashMap<String, ServiceInstance>,
    unavailable: bool,
}

/// 内存服务发现后端
#[derive(Clone)]
pub struct MemoryBackend {
    state: Arc<RwLock<State>>,
    index_tx: Arc<watch::Sender<u64>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (index_tx, _) = watch::channel(1u64);
        Self {
            state: Arc::new(RwLock::new(State::default())),
            index_tx: Arc::new(index_tx),
        }
    }

    fn bump(&self) {
        self.index_tx.send_modify(|i| *i += 1);
    }

    /// 注册（或覆盖）实例
    pub async fn register(&self, instance: ServiceInstance) {
        self.state
            .write()
            .await
            .instances
            .insert(instance.instance_id.clone(), instance);
        self.bump();
    }

    /// 注销实例，实例不存在时返回 `NotFound`
    pub async fn deregister(&self, instance_id: &str) -> Result<()> {
        self.state
            .write()
            .await
            .instances
            .remove(instance_id)
            .ok_or(SkipperError::NotFound)?;
        self.bump();
        Ok(())
    }

    /// 切换实例健康状态
    pub async fn set_health(&self, instance_id: &str, healthy: bool) -> Result<()> {
        {
            let mut state = self.state.write().await;
            let instance = state
                .instances
                .get_mut(instance_id)
                .ok_or(SkipperError::NotFound)?;
            instance.healthy = healthy;
        }
        self.bump();
        Ok(())
    }

    /// 模拟注册中心不可达
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
        self.bump();
    }

    /// 当前版本号
    pub fn index(&self) -> u64 {
        *self.index_tx.borrow()
    }

    /// 已注册实例数量
    pub async fn count(&self) -> usize {
        self.state.read().await.instances.len()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiscoveryBackend for MemoryBackend {
    async fn query(
        &self,
        query: &InstanceQuery,
        wait_index: u64,
        wait: Duration,
    ) -> Result<QueryResult> {
        if wait_index > 0 {
            let mut rx = self.index_tx.subscribe();
            let changed = async move {
                loop {
                    if *rx.borrow_and_update() > wait_index {
                        break;
                    }
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            };
            // 超时即按当前数据返回，与 Consul 行为一致
            let _ = tokio::time::timeout(wait, changed).await;
        }

        let state = self.state.read().await;
        if state.unavailable {
            return Err(SkipperError::discovery("memory registry unavailable"));
        }

        let instances = state
            .instances
            .values()
            .filter(|inst| inst.matches(&query.service, &query.tags, query.passing_only))
            .cloned()
            .collect();

        Ok(QueryResult {
            instances,
            index: self.index(),
        })
    }
}
