//! 日志中间件测试：结果原样透传

use tower::Layer;

mod common;

use common::capture_logs;

use skipper::error::SkipperError;
use skipper::middleware::{LoggingLayer, LoggingMiddleware};
use skipper::service::{Address, InmemService, Profile, ProfileService};

#[tokio::test]
async fn logging_passes_results_through() {
    let svc = LoggingLayer::new().layer(InmemService::new());

    svc.post_profile(Profile::new("1", "alice")).await.unwrap();
    svc.post_address("1", Address::new("home", "Berlin")).await.unwrap();
    assert_eq!(svc.get_profile("1").await.unwrap().name, "alice");
    assert_eq!(svc.get_addresses("1").await.unwrap().len(), 1);

    assert_eq!(
        svc.post_profile(Profile::new("1", "again")).await.unwrap_err(),
        SkipperError::AlreadyExists
    );
    assert_eq!(svc.get_address("1", "work").await.unwrap_err(), SkipperError::NotFound);
}

#[tokio::test]
async fn wrapped_service_is_shared_state() {
    let inner = InmemService::new();
    let svc = LoggingMiddleware::new(inner.clone());
    svc.post_profile(Profile::new("1", "alice")).await.unwrap();

    assert_eq!(inner.get_profile("1").await.unwrap().name, "alice");
    assert_eq!(svc.into_inner().len().await, 1);
}

#[tokio::test]
async fn logs_method_and_error_per_call() {
    let (logs, _guard) = capture_logs();
    let svc = LoggingLayer::new().layer(InmemService::new());

    svc.post_profile(Profile::new("1", "alice")).await.unwrap();
    let _ = svc.get_profile("missing").await;

    let logs = logs.contents();
    let lines: Vec<&str> = logs.lines().filter(|l| l.contains("Service call")).collect();
    assert_eq!(lines.len(), 2, "{logs}");
    assert!(lines[0].contains("method=\"PostProfile\""), "{logs}");
    assert!(lines[0].contains("took="), "{logs}");
    assert!(lines[1].contains("method=\"GetProfile\""), "{logs}");
    assert!(lines[1].contains("error=\"not found\""), "{logs}");
}
