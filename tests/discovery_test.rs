//! 服务发现测试：内存注册表、实例监听器、Endpointer

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use skipper::discovery::{
    DiscoveryBackend, EndpointSource, Endpointer, InstanceQuery, Instancer, InstancerConfig,
    MemoryBackend, ServiceInstance,
};
use skipper::endpoint::{Closer, Endpoint, Factory, FactoryOutput, Request, Response, endpoint_fn};
use skipper::error::{Result, SkipperError};
use skipper::lb::{Balancer, RoundRobin};
use skipper::service::Profile;
use tokio::sync::{Notify, watch};
use tokio_test::{assert_err, assert_ok};

fn prod(id: &str, addr: &str) -> ServiceInstance {
    ServiceInstance::new("skipper", id, addr).with_tag("prod")
}

fn query() -> InstanceQuery {
    InstanceQuery::new("skipper", vec!["prod".to_string()], true)
}

fn fast_config() -> InstancerConfig {
    InstancerConfig::default()
        .with_wait(Duration::from_millis(500))
        .with_backoff(Duration::from_millis(5), Duration::from_millis(50))
}

async fn eventually(what: &str, check: impl Fn() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

fn addresses(instancer: &Instancer) -> Vec<String> {
    instancer.instances().iter().map(|i| i.address.clone()).collect()
}

struct CountingCloser(Arc<AtomicUsize>);

impl Closer for CountingCloser {
    fn close(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// 统计创建与关闭次数的工厂；地址以 `bad` 开头时构建失败
#[derive(Clone, Default)]
struct Counters {
    made: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl Counters {
    fn factory(&self) -> Arc<dyn Factory> {
        let counters = self.clone();
        Arc::new(move |instance: &str| -> Result<FactoryOutput> {
            if instance.starts_with("bad") {
                return Err(SkipperError::endpoint_construction(instance, "unreachable"));
            }
            counters.made.fetch_add(1, Ordering::SeqCst);
            let ep: Arc<dyn Endpoint> = Arc::new(endpoint_fn(|_req| async { Ok(Response::Empty) }));
            let closer: Box<dyn Closer> = Box::new(CountingCloser(counters.closed.clone()));
            Ok((ep, Some(closer)))
        })
    }

    fn made(&self) -> usize {
        self.made.load(Ordering::SeqCst)
    }

    fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn memory_backend_filters_by_tags_and_health() {
    let backend = MemoryBackend::new();
    backend.register(prod("a", "10.0.0.1:80")).await;
    backend.register(ServiceInstance::new("skipper", "b", "10.0.0.2:80")).await;
    backend.register(prod("c", "10.0.0.3:80").with_health(false)).await;
    backend.register(ServiceInstance::new("other", "d", "10.0.0.4:80").with_tag("prod")).await;

    let result = backend.query(&query(), 0, Duration::ZERO).await.unwrap();
    assert_eq!(result.instances.len(), 1);
    assert_eq!(result.instances[0].instance_id, "a");

    let any_health = InstanceQuery::new("skipper", vec!["prod".to_string()], false);
    let result = backend.query(&any_health, 0, Duration::ZERO).await.unwrap();
    assert_eq!(result.instances.len(), 2);
}

#[tokio::test]
async fn memory_backend_blocking_query_waits_for_change() {
    let backend = MemoryBackend::new();
    let index = backend.index();

    let waiter = {
        let backend = backend.clone();
        tokio::spawn(async move { backend.query(&query(), index, Duration::from_secs(5)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    backend.register(prod("a", "10.0.0.1:80")).await;
    let result = waiter.await.unwrap().unwrap();
    assert!(result.index > index);
    assert_eq!(result.instances.len(), 1);
}

#[tokio::test]
async fn memory_backend_deregister_unknown() {
    let backend = MemoryBackend::new();
    assert_eq!(backend.deregister("ghost").await.unwrap_err(), SkipperError::NotFound);
    assert_err!(backend.set_health("ghost", false).await);
}

#[tokio::test]
async fn instancer_initial_snapshot_is_sorted() {
    let backend = MemoryBackend::new();
    backend.register(prod("b", "10.0.0.2:80")).await;
    backend.register(prod("a", "10.0.0.1:80")).await;

    let instancer = Instancer::with_config(Arc::new(backend), query(), fast_config())
        .await
        .unwrap();
    assert_eq!(addresses(&instancer), ["10.0.0.1:80", "10.0.0.2:80"]);
    instancer.stop().await;
}

#[tokio::test]
async fn instancer_construction_fails_when_registry_unreachable() {
    let backend = MemoryBackend::new();
    backend.set_unavailable(true).await;

    let result = Instancer::with_config(Arc::new(backend), query(), fast_config()).await;
    assert!(matches!(result, Err(SkipperError::DiscoveryUnavailable(_))));
}

#[tokio::test]
async fn instancer_publishes_membership_changes() {
    let backend = MemoryBackend::new();
    backend.register(prod("a", "10.0.0.1:80")).await;

    let instancer = Instancer::with_config(Arc::new(backend.clone()), query(), fast_config())
        .await
        .unwrap();
    let mut rx = instancer.subscribe();

    backend.register(prod("b", "10.0.0.2:80")).await;
    assert_ok!(tokio::time::timeout(Duration::from_secs(5), rx.changed()).await);
    assert_eq!(rx.borrow_and_update().len(), 2);

    assert_ok!(backend.set_health("a", false).await);
    eventually("unhealthy instance to disappear", || {
        addresses(&instancer) == ["10.0.0.2:80"]
    })
    .await;

    instancer.stop().await;
}

#[tokio::test]
async fn instancer_keeps_last_known_good_on_failure() {
    let backend = MemoryBackend::new();
    backend.register(prod("a", "10.0.0.1:80")).await;

    let instancer = Instancer::with_config(Arc::new(backend.clone()), query(), fast_config())
        .await
        .unwrap();

    backend.set_unavailable(true).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(addresses(&instancer), ["10.0.0.1:80"]);

    backend.set_unavailable(false).await;
    backend.register(prod("b", "10.0.0.2:80")).await;
    eventually("recovery after registry comes back", || {
        instancer.instances().len() == 2
    })
    .await;

    instancer.stop().await;
}

#[tokio::test]
async fn instancer_stop_freezes_snapshot() {
    let backend = MemoryBackend::new();
    let instancer = Instancer::with_config(Arc::new(backend.clone()), query(), fast_config())
        .await
        .unwrap();

    instancer.stop().await;
    assert!(instancer.is_stopped());

    backend.register(prod("a", "10.0.0.1:80")).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(instancer.instances().is_empty());
}

#[tokio::test]
async fn endpointer_builds_one_endpoint_per_healthy_instance() {
    let counters = Counters::default();
    let (_tx, rx) = watch::channel(Arc::new(vec![
        prod("b", "10.0.0.2:80"),
        prod("a", "10.0.0.1:80"),
        prod("c", "10.0.0.3:80").with_health(false),
    ]));

    let endpointer = Endpointer::from_receiver("GetProfile", rx, counters.factory());
    let set = endpointer.endpoints();
    assert_eq!(set.addresses(), ["10.0.0.1:80", "10.0.0.2:80"]);
    assert_eq!(counters.made(), 2);
    assert_eq!(endpointer.name(), "GetProfile");
    endpointer.close().await;
}

#[tokio::test]
async fn endpointer_reuses_and_closes_endpoints() {
    let counters = Counters::default();
    let (tx, rx) = watch::channel(Arc::new(vec![
        prod("a", "10.0.0.1:80"),
        prod("b", "10.0.0.2:80"),
    ]));
    let endpointer = Endpointer::from_receiver("GetProfile", rx, counters.factory());

    // b 消失，c 出现，a 保留
    tx.send(Arc::new(vec![prod("a", "10.0.0.1:80"), prod("c", "10.0.0.3:80")]))
        .unwrap();
    eventually("reconciliation", || {
        endpointer.endpoints().addresses() == ["10.0.0.1:80", "10.0.0.3:80"]
    })
    .await;

    assert_eq!(counters.made(), 3);
    assert_eq!(counters.closed(), 1);

    endpointer.close().await;
    assert_eq!(counters.closed(), 3);
    assert!(endpointer.endpoints().is_empty());
}

#[tokio::test]
async fn endpointer_excludes_factory_failures_and_retries_them() {
    let counters = Counters::default();
    let (tx, rx) = watch::channel(Arc::new(vec![
        prod("a", "10.0.0.1:80"),
        prod("x", "bad-host:80"),
    ]));
    let endpointer = Endpointer::from_receiver("GetProfile", rx, counters.factory());
    assert_eq!(endpointer.endpoints().addresses(), ["10.0.0.1:80"]);

    // 失败的实例在下一次对齐时重新尝试（仍然失败），已有端点不重建
    tx.send(Arc::new(vec![
        prod("a", "10.0.0.1:80"),
        prod("x", "bad-host:80"),
        prod("b", "10.0.0.2:80"),
    ]))
    .unwrap();
    eventually("new instance to appear", || endpointer.endpoints().len() == 2).await;
    assert_eq!(counters.made(), 2);

    endpointer.close().await;
}

#[tokio::test]
async fn endpointer_follows_instancer() {
    let counters = Counters::default();
    let backend = MemoryBackend::new();
    backend.register(prod("a", "10.0.0.1:80")).await;

    let instancer = Instancer::with_config(Arc::new(backend.clone()), query(), fast_config())
        .await
        .unwrap();
    let endpointer = Endpointer::new("GetProfile", &instancer, counters.factory());
    assert_eq!(endpointer.endpoints().len(), 1);

    assert_ok!(backend.deregister("a").await);
    eventually("endpoint removal", || endpointer.endpoints().is_empty()).await;
    assert_eq!(counters.closed(), 1);

    endpointer.close().await;
    instancer.stop().await;
}

/// 返回自身地址的工厂；`gated` 地址上的调用会等到 `gate` 放行
fn echo_factory(gated: &str, gate: Arc<Notify>) -> Arc<dyn Factory> {
    let gated = gated.to_string();
    Arc::new(move |instance: &str| -> Result<FactoryOutput> {
        let addr = instance.to_string();
        let blocked = addr == gated;
        let gate = gate.clone();
        let ep: Arc<dyn Endpoint> = Arc::new(endpoint_fn(move |_req| {
            let addr = addr.clone();
            let gate = gate.clone();
            async move {
                if blocked {
                    gate.notified().await;
                }
                Ok(Response::Profile(Profile::new(addr, "")))
            }
        }));
        Ok((ep, None))
    })
}

async fn pick(balancer: &impl Balancer) -> String {
    let request = Request::GetProfile { id: "1".into() };
    let response = balancer.endpoint().unwrap().call(request).await.unwrap();
    response.into_profile().unwrap().id
}

#[tokio::test]
async fn removed_instance_finishes_in_flight_call() {
    let gate = Arc::new(Notify::new());
    let (tx, rx) = watch::channel(Arc::new(vec![
        prod("a", "10.0.0.1:80"),
        prod("b", "10.0.0.2:80"),
    ]));
    let endpointer = Arc::new(Endpointer::from_receiver(
        "GetProfile",
        rx,
        echo_factory("10.0.0.1:80", gate.clone()),
    ));
    let rr = RoundRobin::new(endpointer.clone());

    // 游标从 0 开始，第一次选中地址最小的 a
    let first = rr.endpoint().unwrap();
    let in_flight = tokio::spawn(async move {
        first.call(Request::GetProfile { id: "1".into() }).await
    });

    tx.send(Arc::new(vec![prod("b", "10.0.0.2:80")])).unwrap();
    eventually("a to be removed", || {
        endpointer.endpoints().addresses() == ["10.0.0.2:80"]
    })
    .await;

    for _ in 0..6 {
        assert_eq!(pick(&rr).await, "10.0.0.2:80");
    }
    assert!(!in_flight.is_finished());

    gate.notify_one();
    let response = in_flight.await.unwrap().unwrap();
    assert_eq!(response.into_profile().unwrap().id, "10.0.0.1:80");

    endpointer.close().await;
}

#[tokio::test]
async fn round_robin_follows_shrinking_and_growing_sets() {
    let (tx, rx) = watch::channel(Arc::new(vec![
        prod("a", "10.0.0.1:80"),
        prod("b", "10.0.0.2:80"),
        prod("c", "10.0.0.3:80"),
    ]));
    let endpointer = Arc::new(Endpointer::from_receiver(
        "GetProfile",
        rx,
        echo_factory("", Arc::new(Notify::new())),
    ));
    let rr = RoundRobin::new(endpointer.clone());

    let mut picks = Vec::new();
    for _ in 0..3 {
        picks.push(pick(&rr).await);
    }
    assert_eq!(picks, ["10.0.0.1:80", "10.0.0.2:80", "10.0.0.3:80"]);

    tx.send(Arc::new(vec![prod("a", "10.0.0.1:80")])).unwrap();
    eventually("shrink to one", || endpointer.endpoints().len() == 1).await;
    for _ in 0..4 {
        assert_eq!(pick(&rr).await, "10.0.0.1:80");
    }

    tx.send(Arc::new(vec![
        prod("a", "10.0.0.1:80"),
        prod("b", "10.0.0.2:80"),
        prod("c", "10.0.0.3:80"),
        prod("d", "10.0.0.4:80"),
    ]))
    .unwrap();
    eventually("grow to four", || endpointer.endpoints().len() == 4).await;

    let mut counts = std::collections::HashMap::new();
    for _ in 0..8 {
        *counts.entry(pick(&rr).await).or_insert(0) += 1;
    }
    assert_eq!(counts.len(), 4);
    assert!(counts.values().all(|&c| c == 2));

    tx.send(Arc::new(Vec::new())).unwrap();
    eventually("empty set", || endpointer.endpoints().is_empty()).await;
    assert_eq!(rr.endpoint().err(), Some(SkipperError::NoEndpoints));

    endpointer.close().await;
}
