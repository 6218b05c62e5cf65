//! 服务运行时
//!
//! 管理服务进程的生命周期：启动任务、等待关闭信号或任务退出、优雅关闭。
//!
//! ```rust,no_run
//! use skipper::runtime::{ServiceRuntime, ExitReason};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let reason = ServiceRuntime::new("skipper")
//!     .with_shutdown_signal(async { "interrupt".to_string() })
//!     .run()
//!     .await?;
//! assert_eq!(reason, ExitReason::Signal("interrupt".into()));
//! # Ok(())
//! # }
//! ```

pub mod ready;
pub mod runtime;
pub mod task;

pub use ready::ReadyCheck;
pub use runtime::{ExitReason, ServiceRuntime};
pub use task::{SpawnTask, TaskResult};
