//! 实例监听器
//!
//! 订阅注册中心中某个服务（带标签、可选只要健康实例）的实例集合，
//! 通过 `tokio::sync::watch` 发布最新的实例快照。
//!
//! - 构建时同步查询一次，注册中心不可达直接返回错误
//! - 后台任务循环执行阻塞查询，数据变化时发布新快照
//! - 查询失败时保留上一次成功的快照，只记录日志，不影响调用方
//! - `stop()` 或 drop 时取消后台任务

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::discovery::backend::{DiscoveryBackend, InstanceQuery, QueryResult};
use crate::discovery::instance::ServiceInstance;
use crate::error::Result;

/// 实例快照（按地址排序）
pub type InstanceSet = Arc<Vec<ServiceInstance>>;

/// 实例监听器配置
#[derive(Debug, Clone)]
pub struct InstancerConfig {
    /// 阻塞查询的最长等待时间（默认 10 秒）
    pub wait: Duration,
    /// 查询失败后的初始退避时间（默认 10 毫秒）
    pub initial_backoff: Duration,
    /// 退避上限（默认 1 分钟）
    pub max_backoff: Duration,
}

impl Default for InstancerConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl InstancerConfig {
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }
}

/// 实例监听器
pub struct Instancer {
    query: InstanceQuery,
    rx: watch::Receiver<InstanceSet>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Instancer {
    /// 使用默认配置创建监听器
    pub async fn new(backend: Arc<dyn DiscoveryBackend>, query: InstanceQuery) -> Result<Self> {
        Self::with_config(backend, query, InstancerConfig::default()).await
    }

    /// 创建监听器
    ///
    /// 首次查询失败时返回 `DiscoveryUnavailable`，不会启动后台任务
    pub async fn with_config(
        backend: Arc<dyn DiscoveryBackend>,
        query: InstanceQuery,
        config: InstancerConfig,
    ) -> Result<Self> {
        let initial = backend.query(&query, 0, config.wait).await?;

        info!(
            service = %query.service,
            tags = ?query.tags,
            passing_only = query.passing_only,
            count = initial.instances.len(),
            "Instancer started"
        );

        let index = initial.index;
        let (tx, rx) = watch::channel(Arc::new(sorted(initial.instances)));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(watch_loop(
            backend,
            query.clone(),
            tx,
            index,
            config,
            cancel.clone(),
        ));

        Ok(Self {
            query,
            rx,
            cancel,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// 订阅实例快照变化
    pub fn subscribe(&self) -> watch::Receiver<InstanceSet> {
        self.rx.clone()
    }

    /// 当前实例快照
    pub fn instances(&self) -> InstanceSet {
        self.rx.borrow().clone()
    }

    pub fn query(&self) -> &InstanceQuery {
        &self.query
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 停止订阅并等待后台任务退出
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let _ = handle.await;
            info!(service = %self.query.service, "Instancer stopped");
        }
    }
}

impl Drop for Instancer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn sorted(mut instances: Vec<ServiceInstance>) -> Vec<ServiceInstance> {
    instances.sort_by(|a, b| {
        a.address
            .cmp(&b.address)
            .then_with(|| a.instance_id.cmp(&b.instance_id))
    });
    instances
}

async fn watch_loop(
    backend: Arc<dyn DiscoveryBackend>,
    query: InstanceQuery,
    tx: watch::Sender<InstanceSet>,
    mut last_index: u64,
    config: InstancerConfig,
    cancel: CancellationToken,
) {
    let mut backoff = config.initial_backoff;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = backend.query(&query, last_index, config.wait) => result,
        };

        let retry_after = match result {
            Err(e) => {
                // 保留上一次成功的快照
                warn!(service = %query.service, error = %e, "Failed to refresh service instances");
                Some(backoff)
            }
            Ok(QueryResult { index: 0, .. }) => {
                warn!(service = %query.service, "Registry index is not sane, retrying");
                Some(backoff)
            }
            Ok(QueryResult { index, .. }) if index < last_index => {
                warn!(
                    service = %query.service,
                    index,
                    last_index,
                    "Registry index went backwards, resetting"
                );
                last_index = 0;
                Some(backoff)
            }
            Ok(QueryResult { instances, index }) => {
                last_index = index;
                backoff = config.initial_backoff;

                let next = sorted(instances);
                let changed = tx.send_if_modified(|current| {
                    if **current == next {
                        false
                    } else {
                        *current = Arc::new(next);
                        true
                    }
                });
                if changed {
                    info!(
                        service = %query.service,
                        index,
                        count = tx.borrow().len(),
                        "Service instances updated"
                    );
                } else {
                    debug!(service = %query.service, index, "Service instances unchanged");
                }
                None
            }
        };

        if let Some(delay) = retry_after {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            backoff = (backoff * 2).min(config.max_backoff);
        }
    }

    debug!(service = %query.service, "Instancer watch loop exited");
}
