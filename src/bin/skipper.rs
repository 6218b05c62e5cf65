//! skipper 服务进程
//!
//! 内存资料服务 → 日志中间件 → HTTP 路由，运行到收到关闭信号或 HTTP 监听出错为止。

use clap::Parser;
use std::sync::Arc;
use tower::Layer;
use tracing::info;

use skipper::middleware::LoggingLayer;
use skipper::runtime::{ServiceRuntime, TaskResult};
use skipper::service::{InmemService, ProfileService};
use skipper::transport::http::make_http_handler;
use skipper::utils::parse_listen_addr;

#[derive(Parser, Debug)]
#[command(name = "skipper", version, about = "Profile service over HTTP")]
struct Args {
    /// HTTP listen address (`:port` listens on all interfaces)
    #[arg(long = "http.addr", default_value = ":8080")]
    http_addr: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    skipper::telemetry::init_tracing()?;

    let listener = tokio::net::TcpListener::bind(parse_listen_addr(&args.http_addr)?).await?;
    // `:0` 只有绑定后才知道真实端口
    let addr = listener.local_addr()?;
    info!(transport = "HTTP", addr = %addr, "Listening");

    let service: Arc<dyn ProfileService> = Arc::new(LoggingLayer::new().layer(InmemService::new()));
    let router = make_http_handler(service);

    let reason = ServiceRuntime::new("skipper")
        .with_address(addr)
        .add_spawn_with_shutdown("http", move |shutdown_rx| async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await?;
            TaskResult::Ok(())
        })
        .run()
        .await?;

    info!(exit = %reason, "skipper stopped");
    Ok(())
}
