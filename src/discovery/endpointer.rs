//! Endpointer：实例集合 → 端点集合
//!
//! 对一个操作维护「实例地址 → 端点」的映射，并与实例监听器的快照对齐：
//! - 新出现的健康实例：通过工厂创建端点（已存在则复用）
//! - 消失或变为不健康的实例：移除端点并调用其 `Closer`
//! - 工厂失败：记录日志，该实例不进入可用集合，下次对齐时重试
//!
//! 每次对齐生成一个新的不可变 [`EndpointSet`]，通过 `ArcSwap` 整体替换，
//! 负载均衡器读取的永远是某一个完整快照。

use arc_swap::ArcSwap;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::discovery::instance::ServiceInstance;
use crate::discovery::instancer::{InstanceSet, Instancer};
use crate::endpoint::{Closer, Endpoint, Factory};

/// 不可变的端点集合快照（按实例地址排序）
#[derive(Clone, Default)]
pub struct EndpointSet {
    entries: Vec<(String, Arc<dyn Endpoint>)>,
}

impl EndpointSet {
    pub fn new(mut entries: Vec<(String, Arc<dyn Endpoint>)>) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn Endpoint>> {
        self.entries.get(index).map(|(_, ep)| ep)
    }

    /// 第 `index` 个端点对应的实例地址
    pub fn address(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(addr, _)| addr.as_str())
    }

    pub fn addresses(&self) -> Vec<String> {
        self.entries.iter().map(|(addr, _)| addr.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Endpoint>)> {
        self.entries.iter().map(|(addr, ep)| (addr.as_str(), ep))
    }
}

impl std::fmt::Debug for EndpointSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointSet")
            .field("addresses", &self.addresses())
            .finish()
    }
}

/// 端点来源
///
/// 负载均衡器通过它读取当前端点集合快照
pub trait EndpointSource: Send + Sync {
    fn endpoints(&self) -> Arc<EndpointSet>;
}

impl<T> EndpointSource for Arc<T>
where
    T: EndpointSource + ?Sized,
{
    fn endpoints(&self) -> Arc<EndpointSet> {
        (**self).endpoints()
    }
}

/// 固定端点集合（不做服务发现）
#[derive(Clone, Default)]
pub struct FixedEndpointer {
    set: Arc<EndpointSet>,
}

impl FixedEndpointer {
    pub fn new(entries: Vec<(String, Arc<dyn Endpoint>)>) -> Self {
        Self {
            set: Arc::new(EndpointSet::new(entries)),
        }
    }
}

impl EndpointSource for FixedEndpointer {
    fn endpoints(&self) -> Arc<EndpointSet> {
        self.set.clone()
    }
}

struct CachedEndpoint {
    endpoint: Arc<dyn Endpoint>,
    closer: Option<Box<dyn Closer>>,
}

struct Reconciler {
    name: String,
    factory: Arc<dyn Factory>,
    cache: Mutex<HashMap<String, CachedEndpoint>>,
    current: ArcSwap<EndpointSet>,
}

impl Reconciler {
    fn apply(&self, instances: &[ServiceInstance]) {
        let wanted: BTreeSet<&str> = instances
            .iter()
            .filter(|inst| inst.healthy)
            .map(|inst| inst.address.as_str())
            .collect();

        let Ok(mut cache) = self.cache.lock() else {
            warn!(endpointer = %self.name, "Endpoint cache poisoned, skipping reconciliation");
            return;
        };

        let stale: Vec<String> = cache
            .keys()
            .filter(|addr| !wanted.contains(addr.as_str()))
            .cloned()
            .collect();
        for addr in stale {
            if let Some(entry) = cache.remove(&addr) {
                if let Some(closer) = entry.closer {
                    closer.close();
                }
                debug!(endpointer = %self.name, instance = %addr, "Endpoint removed");
            }
        }

        for addr in &wanted {
            if cache.contains_key(*addr) {
                continue;
            }
            match self.factory.make(addr) {
                Ok((endpoint, closer)) => {
                    debug!(endpointer = %self.name, instance = %addr, "Endpoint created");
                    cache.insert(addr.to_string(), CachedEndpoint { endpoint, closer });
                }
                Err(e) => {
                    warn!(
                        endpointer = %self.name,
                        instance = %addr,
                        error = %e,
                        "Failed to create endpoint, instance excluded"
                    );
                }
            }
        }

        let entries = wanted
            .iter()
            .filter_map(|addr| {
                cache
                    .get(*addr)
                    .map(|cached| (addr.to_string(), cached.endpoint.clone()))
            })
            .collect();
        let set = EndpointSet::new(entries);

        info!(
            endpointer = %self.name,
            instances = instances.len(),
            endpoints = set.len(),
            "Endpoint set reconciled"
        );
        self.current.store(Arc::new(set));
    }

    fn close_all(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            for (_, entry) in cache.drain() {
                if let Some(closer) = entry.closer {
                    closer.close();
                }
            }
        }
        self.current.store(Arc::new(EndpointSet::default()));
    }
}

/// 由实例监听器驱动的 Endpointer
pub struct Endpointer {
    reconciler: Arc<Reconciler>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Endpointer {
    /// 创建 Endpointer
    ///
    /// 立即按监听器当前快照对齐一次，之后在后台跟随快照变化
    pub fn new(name: impl Into<String>, instancer: &Instancer, factory: Arc<dyn Factory>) -> Self {
        Self::from_receiver(name, instancer.subscribe(), factory)
    }

    /// 直接从实例快照通道创建
    pub fn from_receiver(
        name: impl Into<String>,
        mut rx: watch::Receiver<InstanceSet>,
        factory: Arc<dyn Factory>,
    ) -> Self {
        let reconciler = Arc::new(Reconciler {
            name: name.into(),
            factory,
            cache: Mutex::new(HashMap::new()),
            current: ArcSwap::from_pointee(EndpointSet::default()),
        });

        let initial = rx.borrow_and_update().clone();
        reconciler.apply(&initial);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(reconcile_loop(rx, reconciler.clone(), cancel.clone()));

        Self {
            reconciler,
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn name(&self) -> &str {
        &self.reconciler.name
    }

    /// 停止跟随实例变化，并关闭所有端点
    pub async fn close(&self) {
        self.cancel.cancel();
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.reconciler.close_all();
        debug!(endpointer = %self.reconciler.name, "Endpointer closed");
    }
}

impl EndpointSource for Endpointer {
    fn endpoints(&self) -> Arc<EndpointSet> {
        self.reconciler.current.load_full()
    }
}

impl Drop for Endpointer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn reconcile_loop(
    mut rx: watch::Receiver<InstanceSet>,
    reconciler: Arc<Reconciler>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    // 监听器已释放，保留最后的端点集合
                    debug!(endpointer = %reconciler.name, "Instance source closed");
                    break;
                }
            }
        }

        let instances = rx.borrow_and_update().clone();
        reconciler.apply(&instances);
    }
}
