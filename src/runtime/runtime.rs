//! 服务运行时实现
//!
//! 关闭信号与所有任务通过同一个 `mpsc` 通道竞争：最先到达的事件决定退出原因。
//! 随后向所有任务发送关闭信号，在 `shutdown_timeout` 内等待它们退出，超时则强制中止。

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::InfraResult;
use crate::runtime::ready::ReadyCheck;
use crate::runtime::task::{SpawnTask, TaskResult};

type SignalFuture = Pin<Box<dyn Future<Output = String> + Send>>;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// 运行时退出原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// 收到关闭信号（`"interrupt"` / `"terminated"`）
    Signal(String),
    /// 某个任务先于信号退出；`error` 为 `None` 表示正常返回
    TaskExited { task: String, error: Option<String> },
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal(name) => f.write_str(name),
            ExitReason::TaskExited { task, error: Some(e) } => write!(f, "{}: {}", task, e),
            ExitReason::TaskExited { task, error: None } => write!(f, "{}: exited", task),
        }
    }
}

enum Event {
    Signal(String),
    Task { name: String, result: TaskResult },
}

/// 服务运行时
///
/// ```rust,no_run
/// use skipper::runtime::ServiceRuntime;
///
/// # async fn example() -> anyhow::Result<()> {
/// let reason = ServiceRuntime::new("skipper")
///     .add_spawn_with_shutdown("worker", |shutdown_rx| async move {
///         let _ = shutdown_rx.await;
///         Ok(())
///     })
///     .run()
///     .await?;
/// println!("exit: {}", reason);
/// # Ok(())
/// # }
/// ```
pub struct ServiceRuntime {
    service_name: String,
    ready_check: Option<ReadyCheck>,
    tasks: Vec<SpawnTask>,
    signal: Option<SignalFuture>,
    shutdown_timeout: Duration,
}

impl ServiceRuntime {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ready_check: None,
            tasks: Vec::new(),
            signal: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// 设置已绑定的监听地址，启动后对其做就绪检查（默认 30 秒超时）
    pub fn with_address(self, address: SocketAddr) -> Self {
        self.with_ready_check(ReadyCheck::new(address))
    }

    pub fn with_ready_check(mut self, check: ReadyCheck) -> Self {
        self.ready_check = Some(check);
        self
    }

    /// 收到关闭信号后等待任务退出的时间（默认 5 秒），超时后强制中止
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// 替换默认的关闭信号（SIGINT / SIGTERM）
    ///
    /// Future 完成时的输出作为信号名称
    pub fn with_shutdown_signal<Fut>(mut self, signal: Fut) -> Self
    where
        Fut: Future<Output = String> + Send + 'static,
    {
        self.signal = Some(Box::pin(signal));
        self
    }

    pub fn add_task(mut self, task: SpawnTask) -> Self {
        info!(task_name = %task.name(), "Adding task to runtime");
        self.tasks.push(task);
        self
    }

    /// 添加不需要关闭信号的任务
    pub fn add_spawn<Fut>(self, name: impl Into<String>, future: Fut) -> Self
    where
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        self.add_task(SpawnTask::new(name, future))
    }

    /// 添加需要关闭信号的任务，例如 HTTP 服务器
    pub fn add_spawn_with_shutdown<F, Fut>(self, name: impl Into<String>, future_fn: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        self.add_task(SpawnTask::with_shutdown(name, future_fn))
    }

    /// 运行直到收到关闭信号或某个任务退出，返回退出原因
    pub async fn run(mut self) -> InfraResult<ExitReason> {
        info!(
            service_name = %self.service_name,
            address = ?self.ready_check.map(|c| c.address()),
            task_count = self.tasks.len(),
            "Starting service runtime"
        );

        let (event_tx, mut event_rx) = mpsc::channel::<Event>(self.tasks.len() + 1);

        let signal: SignalFuture = match self.signal.take() {
            Some(signal) => signal,
            None => Box::pin(default_signal()),
        };
        let signal_tx = event_tx.clone();
        let signal_handle = tokio::spawn(async move {
            let name = signal.await;
            let _ = signal_tx.send(Event::Signal(name)).await;
        });

        let tasks = std::mem::take(&mut self.tasks);
        let (mut join_set, task_shutdowns) = Self::start_tasks(tasks, &event_tx);

        let ready = Self::wait_for_ready(&self.ready_check);
        tokio::pin!(ready);
        let mut ready_done = false;

        let event = loop {
            tokio::select! {
                event = event_rx.recv() => break event,
                result = &mut ready, if !ready_done => {
                    ready_done = true;
                    if let Err(e) = result {
                        warn!(service_name = %self.service_name, error = %e, "Service ready check failed");
                    }
                }
            }
        };

        let reason = match event {
            Some(Event::Signal(name)) => {
                info!(signal = %name, "Shutdown signal received");
                ExitReason::Signal(name)
            }
            Some(Event::Task { name, result }) => {
                let error = result.err().map(|e| e.to_string());
                ExitReason::TaskExited { task: name, error }
            }
            // event_tx 在此之前一直存活，通道不会关闭
            None => ExitReason::Signal("closed".to_string()),
        };

        signal_handle.abort();
        for tx in task_shutdowns {
            let _ = tx.send(());
        }
        drop(event_tx);

        Self::wait_for_tasks_shutdown(self.shutdown_timeout, &mut join_set).await;

        info!(service_name = %self.service_name, exit = %reason, "Service runtime stopped");
        Ok(reason)
    }

    async fn wait_for_ready(ready_check: &Option<ReadyCheck>) -> InfraResult<()> {
        match ready_check {
            Some(check) => check.wait().await,
            None => Ok(()),
        }
    }

    fn start_tasks(
        tasks: Vec<SpawnTask>,
        event_tx: &mpsc::Sender<Event>,
    ) -> (JoinSet<()>, Vec<oneshot::Sender<()>>) {
        let mut join_set = JoinSet::new();
        let mut task_shutdowns = Vec::with_capacity(tasks.len());

        for task in tasks {
            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            task_shutdowns.push(shutdown_tx);

            let (name, future) = task.run(shutdown_rx);
            let tx = event_tx.clone();

            join_set.spawn(async move {
                let result = future.await;
                match &result {
                    Ok(()) => info!(task_name = %name, "Task completed"),
                    Err(e) => error!(task_name = %name, error = %e, "Task failed"),
                }
                // 竞争结束后接收端不再读取，发送失败可以忽略
                let _ = tx.send(Event::Task { name, result }).await;
            });
        }

        (join_set, task_shutdowns)
    }

    async fn wait_for_tasks_shutdown(timeout: Duration, join_set: &mut JoinSet<()>) {
        let drained = tokio::time::timeout(timeout, async {
            while let Some(result) = join_set.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Task join error");
                }
            }
        })
        .await;

        match drained {
            Ok(()) => info!("All tasks completed"),
            Err(_) => {
                warn!(timeout = ?timeout, "Tasks shutdown timeout, forcing exit");
                join_set.abort_all();
            }
        }
    }
}

/// 默认关闭信号：Ctrl+C → `"interrupt"`，SIGTERM → `"terminated"`
async fn default_signal() -> String {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => interrupt(result).await,
                    _ = term.recv() => "terminated".to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                interrupt(tokio::signal::ctrl_c().await).await
            }
        }
    }

    #[cfg(not(unix))]
    {
        interrupt(tokio::signal::ctrl_c().await).await
    }
}

async fn interrupt(result: std::io::Result<()>) -> String {
    if let Err(e) = result {
        // 无法监听信号时不应立即退出
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    "interrupt".to_string()
}
