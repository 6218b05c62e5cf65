//! 就绪检查
//!
//! 只有给运行时设置了监听地址才会检查；失败只记录告警，不影响运行。

use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

use crate::error::InfraResult;

const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// 对监听地址的就绪探测
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyCheck {
    address: SocketAddr,
    timeout: Duration,
}

impl ReadyCheck {
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 端口 0 表示尚未绑定，无法探测
    pub(crate) async fn wait(&self) -> InfraResult<()> {
        if self.address.port() == 0 {
            anyhow::bail!("cannot probe unbound address {}", self.address);
        }

        match tokio::time::timeout(
            self.timeout,
            crate::utils::wait_for_server_ready(self.address),
        )
        .await
        {
            Ok(Ok(())) => {
                info!(address = %self.address, "Service is ready");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(anyhow::anyhow!("ready check timeout after {:?}", self.timeout)),
        }
    }
}
