//! 服务运行时测试：退出原因、关闭信号分发、超时中止

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tower::Layer;

mod common;

use common::capture_logs;
use skipper::middleware::LoggingLayer;
use skipper::runtime::{ExitReason, ReadyCheck, ServiceRuntime, TaskResult};
use skipper::service::{InmemService, Profile, ProfileService};
use skipper::transport::http::{HttpClient, make_http_handler};

#[tokio::test]
async fn signal_shuts_down_tasks() {
    let stopped = Arc::new(AtomicBool::new(false));
    let flag = stopped.clone();

    let reason = ServiceRuntime::new("test")
        .with_shutdown_signal(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            "interrupt".to_string()
        })
        .add_spawn_with_shutdown("worker", move |shutdown_rx| async move {
            let _ = shutdown_rx.await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .run()
        .await
        .unwrap();

    assert_eq!(reason, ExitReason::Signal("interrupt".to_string()));
    assert_eq!(reason.to_string(), "interrupt");
    assert!(stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn failing_task_ends_the_run() {
    let reason = ServiceRuntime::new("test")
        .with_shutdown_signal(std::future::pending::<String>())
        .add_spawn("broken", async { Err("bind failed".into()) })
        .add_spawn_with_shutdown("worker", |shutdown_rx| async move {
            let _ = shutdown_rx.await;
            Ok(())
        })
        .run()
        .await
        .unwrap();

    assert_eq!(
        reason,
        ExitReason::TaskExited {
            task: "broken".to_string(),
            error: Some("bind failed".to_string()),
        }
    );
    assert_eq!(reason.to_string(), "broken: bind failed");
}

#[tokio::test]
async fn task_returning_ok_is_reported_without_error() {
    let reason = ServiceRuntime::new("test")
        .with_shutdown_signal(std::future::pending::<String>())
        .add_spawn("oneshot", async { Ok(()) })
        .run()
        .await
        .unwrap();

    assert_eq!(
        reason,
        ExitReason::TaskExited {
            task: "oneshot".to_string(),
            error: None,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn stubborn_task_is_aborted_after_timeout() {
    let reason = tokio::time::timeout(
        Duration::from_secs(10),
        ServiceRuntime::new("test")
            .with_shutdown_timeout(Duration::from_millis(200))
            .with_shutdown_signal(async { "terminated".to_string() })
            .add_spawn("stubborn", std::future::pending::<TaskResult>())
            .run(),
    )
    .await
    .expect("runtime did not stop")
    .unwrap();

    assert_eq!(reason, ExitReason::Signal("terminated".to_string()));
}

#[tokio::test]
async fn hosts_http_service_until_signal() {
    let (logs, _guard) = capture_logs();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let service: Arc<dyn ProfileService> =
        Arc::new(LoggingLayer::new().layer(InmemService::new()));
    let router = make_http_handler(service);
    let (signal_tx, signal_rx) = oneshot::channel::<()>();

    let runtime = ServiceRuntime::new("skipper")
        .with_address(addr)
        .with_shutdown_signal(async move {
            let _ = signal_rx.await;
            "interrupt".to_string()
        })
        .add_spawn_with_shutdown("http", move |shutdown_rx| async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await?;
            TaskResult::Ok(())
        });
    let handle = tokio::spawn(runtime.run());

    let client = HttpClient::new(&addr.to_string()).unwrap();
    client.post_profile(Profile::new("1", "alice")).await.unwrap();
    assert_eq!(client.get_profile("1").await.unwrap().name, "alice");

    signal_tx.send(()).unwrap();
    let reason = handle.await.unwrap().unwrap();
    assert_eq!(reason, ExitReason::Signal("interrupt".to_string()));

    assert!(client.get_profile("1").await.is_err());

    let logs = logs.contents();
    assert!(logs.contains("Service call"), "{logs}");
    assert!(logs.contains("method=\"GetProfile\""), "{logs}");
    assert!(logs.contains("method=\"PostProfile\""), "{logs}");
    assert!(logs.contains("exit=interrupt"), "{logs}");
}

#[tokio::test]
async fn unbound_address_fails_ready_check_without_stopping() {
    let (logs, _guard) = capture_logs();

    let reason = ServiceRuntime::new("test")
        .with_ready_check(
            ReadyCheck::new("127.0.0.1:0".parse().unwrap()).with_timeout(Duration::from_secs(5)),
        )
        .with_shutdown_signal(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            "interrupt".to_string()
        })
        .run()
        .await
        .unwrap();

    assert_eq!(reason, ExitReason::Signal("interrupt".to_string()));
    let logs = logs.contents();
    assert!(logs.contains("Service ready check failed"), "{logs}");
    assert!(logs.contains("cannot probe unbound address"), "{logs}");
}
