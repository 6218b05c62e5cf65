//! 日志中间件
//!
//! 每次调用结束后记录一条日志：`method`、`took`（毫秒）、`error`（成功时为空）。
//! 返回值原样透传。

use async_trait::async_trait;
use std::time::Instant;
use tower::Layer;
use tracing::info;

use crate::error::{Result, SkipperError};
use crate::service::{Address, Profile, ProfileService};

/// 日志中间件层
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer;

impl LoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingMiddleware { inner }
    }
}

/// 带日志的 `ProfileService` 装饰器
#[derive(Debug, Clone)]
pub struct LoggingMiddleware<S> {
    inner: S,
}

impl<S> LoggingMiddleware<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

fn log_call<T>(method: &'static str, start: Instant, result: &Result<T>) {
    let took = start.elapsed().as_millis() as u64;
    let error = result.as_ref().err().map(SkipperError::to_string);
    info!(
        method,
        took,
        error = error.as_deref().unwrap_or(""),
        "Service call"
    );
}

#[async_trait]
impl<S: ProfileService> ProfileService for LoggingMiddleware<S> {
    async fn post_profile(&self, profile: Profile) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.post_profile(profile).await;
        log_call("PostProfile", start, &result);
        result
    }

    async fn get_profile(&self, id: &str) -> Result<Profile> {
        let start = Instant::now();
        let result = self.inner.get_profile(id).await;
        log_call("GetProfile", start, &result);
        result
    }

    async fn put_profile(&self, id: &str, profile: Profile) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.put_profile(id, profile).await;
        log_call("PutProfile", start, &result);
        result
    }

    async fn patch_profile(&self, id: &str, profile: Profile) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.patch_profile(id, profile).await;
        log_call("PatchProfile", start, &result);
        result
    }

    async fn delete_profile(&self, id: &str) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.delete_profile(id).await;
        log_call("DeleteProfile", start, &result);
        result
    }

    async fn get_addresses(&self, profile_id: &str) -> Result<Vec<Address>> {
        let start = Instant::now();
        let result = self.inner.get_addresses(profile_id).await;
        log_call("GetAddresses", start, &result);
        result
    }

    async fn get_address(&self, profile_id: &str, address_id: &str) -> Result<Address> {
        let start = Instant::now();
        let result = self.inner.get_address(profile_id, address_id).await;
        log_call("GetAddress", start, &result);
        result
    }

    async fn post_address(&self, profile_id: &str, address: Address) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.post_address(profile_id, address).await;
        log_call("PostAddress", start, &result);
        result
    }

    async fn delete_address(&self, profile_id: &str, address_id: &str) -> Result<()> {
        let start = Instant::now();
        let result = self.inner.delete_address(profile_id, address_id).await;
        log_call("DeleteAddress", start, &result);
        result
    }
}
