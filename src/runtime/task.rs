//! 任务定义模块

use std::future::Future;
use std::pin::Pin;
use tokio::sync::oneshot;

/// 任务执行结果
pub type TaskResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type TaskFn =
    Box<dyn FnOnce(oneshot::Receiver<()>) -> Pin<Box<dyn Future<Output = TaskResult> + Send>> + Send>;

/// Spawn 任务
///
/// 用闭包延迟构建 Future，以便在运行时启动时传入关闭信号
pub struct SpawnTask {
    name: String,
    future_fn: TaskFn,
}

impl SpawnTask {
    /// 不需要关闭信号的任务
    pub fn new<Fut>(name: impl Into<String>, future: Fut) -> Self
    where
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            future_fn: Box::new(move |_shutdown_rx| Box::pin(future)),
        }
    }

    /// 需要关闭信号的任务
    ///
    /// ```rust,no_run
    /// use skipper::runtime::SpawnTask;
    ///
    /// let task = SpawnTask::with_shutdown("worker", |shutdown_rx| async move {
    ///     let _ = shutdown_rx.await;
    ///     Ok(())
    /// });
    /// ```
    pub fn with_shutdown<F, Fut>(name: impl Into<String>, future_fn: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            future_fn: Box::new(move |shutdown_rx| Box::pin(future_fn(shutdown_rx))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn run(
        self,
        shutdown_rx: oneshot::Receiver<()>,
    ) -> (String, Pin<Box<dyn Future<Output = TaskResult> + Send>>) {
        (self.name, (self.future_fn)(shutdown_rx))
    }
}

impl std::fmt::Debug for SpawnTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnTask").field("name", &self.name).finish()
    }
}
