//! 工具函数模块

use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::error::InfraResult;

/// 解析监听地址
///
/// 支持 `:8080`（监听所有网卡）、`127.0.0.1:8080`、`localhost:8080`
pub fn parse_listen_addr(addr: &str) -> InfraResult<SocketAddr> {
    let addr = addr.trim();
    if let Some(port) = addr.strip_prefix(':') {
        let port: u16 = port
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid port in {:?}: {}", addr, e))?;
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }

    if let Ok(parsed) = addr.parse::<SocketAddr>() {
        return Ok(parsed);
    }

    addr.to_socket_addrs()
        .map_err(|e| anyhow::anyhow!("invalid listen address {:?}: {}", addr, e))?
        .next()
        .ok_or_else(|| anyhow::anyhow!("listen address {:?} resolved to nothing", addr))
}

/// 等待服务启动就绪（通过 TCP 连接重试）
///
/// 指数退避重试连接，直到服务可以接受连接。
/// 监听在 `0.0.0.0` / `::` 上的服务通过本机回环地址探测。
pub async fn wait_for_server_ready(address: SocketAddr) -> InfraResult<()> {
    const MAX_RETRIES: u32 = 30;
    const INITIAL_DELAY_MS: u64 = 50;
    const MAX_DELAY_MS: u64 = 500;

    let target = probe_addr(address);
    let start = std::time::Instant::now();
    let mut delay_ms = INITIAL_DELAY_MS;

    for attempt in 1..=MAX_RETRIES {
        match timeout(Duration::from_millis(100), TcpStream::connect(target)).await {
            Ok(Ok(_)) => {
                debug!(
                    address = %target,
                    attempts = attempt,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Server is ready"
                );
                return Ok(());
            }
            Ok(Err(e)) => {
                debug!(address = %target, attempt, error = %e, "Connection attempt failed, retrying...");
            }
            Err(_) => {
                debug!(address = %target, attempt, "Connection attempt timed out, retrying...");
            }
        }

        sleep(Duration::from_millis(delay_ms)).await;
        delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
    }

    Err(anyhow::anyhow!(
        "Server readiness check failed after {} attempts",
        MAX_RETRIES
    ))
}

fn probe_addr(address: SocketAddr) -> SocketAddr {
    match address.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), address.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(std::net::Ipv6Addr::LOCALHOST), address.port())
        }
        _ => address,
    }
}
