//! 重试包装器
//!
//! 包装一个负载均衡器：每次尝试重新选择端点并调用，成功立即返回；
//! 失败后由 [`RetryPolicy`] 决定是否继续。整个调用共用一个时间预算，
//! 单次尝试没有独立超时，预算耗尽时正在进行的尝试会被放弃。
//!
//! 默认策略 [`MaxAttempts`] 把所有错误都视为可重试（包括 `NoEndpoints`）。
//! 对 POST 这类非幂等操作重试可能造成重复写入，调用方可以换用自定义策略。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::Balancer;
use crate::endpoint::{Endpoint, Request, Response};
use crate::error::{Result, SkipperError};

/// 一次失败后的决定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDecision {
    /// 是否继续重试
    pub keep_trying: bool,
    /// 替换本次错误（为 `None` 时保留原错误）
    pub replacement: Option<SkipperError>,
}

impl RetryDecision {
    pub fn retry() -> Self {
        Self {
            keep_trying: true,
            replacement: None,
        }
    }

    pub fn stop() -> Self {
        Self {
            keep_trying: false,
            replacement: None,
        }
    }

    pub fn stop_with(error: SkipperError) -> Self {
        Self {
            keep_trying: false,
            replacement: Some(error),
        }
    }
}

/// 重试策略 trait
///
/// `attempt` 从 1 开始，表示刚刚失败的是第几次尝试
pub trait RetryPolicy: Send + Sync {
    fn decide(&self, attempt: usize, error: &SkipperError) -> RetryDecision;
}

impl<F> RetryPolicy for F
where
    F: Fn(usize, &SkipperError) -> RetryDecision + Send + Sync,
{
    fn decide(&self, attempt: usize, error: &SkipperError) -> RetryDecision {
        self(attempt, error)
    }
}

/// 最多尝试 `max` 次，任何错误都重试
///
/// 至少会尝试一次（`max` 为 0 时等同于 1）
#[derive(Debug, Clone, Copy)]
pub struct MaxAttempts(pub usize);

impl RetryPolicy for MaxAttempts {
    fn decide(&self, attempt: usize, _error: &SkipperError) -> RetryDecision {
        if attempt < self.0 {
            RetryDecision::retry()
        } else {
            RetryDecision::stop()
        }
    }
}

/// 只重试调用链路上的错误（见 [`ErrorCode::is_transient`]），业务错误立即返回
///
/// [`ErrorCode::is_transient`]: crate::error::ErrorCode::is_transient
#[derive(Debug, Clone, Copy)]
pub struct TransientOnly(pub usize);

impl RetryPolicy for TransientOnly {
    fn decide(&self, attempt: usize, error: &SkipperError) -> RetryDecision {
        if attempt < self.0 && error.code().is_transient() {
            RetryDecision::retry()
        } else {
            RetryDecision::stop()
        }
    }
}

/// 重试包装器，本身也是一个端点
pub struct Retry<B> {
    balancer: B,
    timeout: Duration,
    policy: Arc<dyn RetryPolicy>,
}

impl<B: Balancer> Retry<B> {
    /// 最多 `max` 次尝试、总时间预算 `timeout`
    pub fn new(max: usize, timeout: Duration, balancer: B) -> Self {
        Self::with_callback(timeout, balancer, MaxAttempts(max))
    }

    /// 使用自定义策略决定何时停止
    pub fn with_callback(timeout: Duration, balancer: B, policy: impl RetryPolicy + 'static) -> Self {
        Self {
            balancer,
            timeout,
            policy: Arc::new(policy),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(&self, request: Request) -> Result<Response> {
        let endpoint = self.balancer.endpoint()?;
        endpoint.call(request).await
    }
}

#[async_trait]
impl<B: Balancer> Endpoint for Retry<B> {
    async fn call(&self, request: Request) -> Result<Response> {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let operation = request.operation();

        let mut attempts = 0usize;
        let mut last: Option<SkipperError> = None;

        loop {
            attempts += 1;

            let error = match tokio::time::timeout_at(deadline, self.attempt(request.clone())).await
            {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => e,
                Err(_) => return Err(timed_out(attempts, start, last)),
            };

            debug!(
                operation = %operation,
                attempt = attempts,
                error = %error,
                "Attempt failed"
            );

            let decision = self.policy.decide(attempts, &error);
            let error = decision.replacement.unwrap_or(error);
            if !decision.keep_trying {
                return Err(SkipperError::RetryExhausted {
                    attempts,
                    source: Box::new(error),
                });
            }
            last = Some(error);

            if Instant::now() >= deadline {
                return Err(timed_out(attempts, start, last));
            }
            // 立即失败的尝试（如 NoEndpoints）不会让出线程
            tokio::task::yield_now().await;
        }
    }
}

fn timed_out(attempts: usize, start: Instant, last: Option<SkipperError>) -> SkipperError {
    SkipperError::RetryTimeout {
        attempts,
        elapsed: start.elapsed(),
        source: Box::new(last.unwrap_or(SkipperError::DeadlineExceeded)),
    }
}
