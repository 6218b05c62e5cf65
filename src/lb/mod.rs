//! 负载均衡模块
//!
//! 从端点来源的当前快照中为每次调用选择一个端点。
//! 快照为空时返回 `NoEndpoints`，该错误对重试包装器来说是可重试的。

pub mod retry;

pub use retry::{MaxAttempts, Retry, RetryDecision, RetryPolicy, TransientOnly};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::discovery::EndpointSource;
use crate::endpoint::Endpoint;
use crate::error::{Result, SkipperError};

/// 负载均衡器 trait
pub trait Balancer: Send + Sync {
    /// 选择一个端点
    fn endpoint(&self) -> Result<Arc<dyn Endpoint>>;
}

impl<T> Balancer for Arc<T>
where
    T: Balancer + ?Sized,
{
    fn endpoint(&self) -> Result<Arc<dyn Endpoint>> {
        (**self).endpoint()
    }
}

/// 轮询负载均衡器
///
/// 游标在多次调用之间保留；集合大小变化时按当前大小取模，不会越界
pub struct RoundRobin<E> {
    source: E,
    cursor: AtomicUsize,
}

impl<E: EndpointSource> RoundRobin<E> {
    pub fn new(source: E) -> Self {
        Self::starting_at(source, 0)
    }

    /// 从指定游标位置开始轮询
    pub fn starting_at(source: E, start: usize) -> Self {
        Self {
            source,
            cursor: AtomicUsize::new(start),
        }
    }
}

impl<E: EndpointSource> Balancer for RoundRobin<E> {
    fn endpoint(&self) -> Result<Arc<dyn Endpoint>> {
        let set = self.source.endpoints();
        if set.is_empty() {
            return Err(SkipperError::NoEndpoints);
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % set.len();
        set.get(index).cloned().ok_or(SkipperError::NoEndpoints)
    }
}

/// 随机负载均衡器
pub struct Random<E> {
    source: E,
    rng: Mutex<StdRng>,
}

impl<E: EndpointSource> Random<E> {
    pub fn new(source: E, seed: u64) -> Self {
        Self {
            source,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl<E: EndpointSource> Balancer for Random<E> {
    fn endpoint(&self) -> Result<Arc<dyn Endpoint>> {
        let set = self.source.endpoints();
        if set.is_empty() {
            return Err(SkipperError::NoEndpoints);
        }
        let index = match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..set.len()),
            Err(_) => return Err(SkipperError::Internal("balancer rng poisoned".to_string())),
        };
        set.get(index).cloned().ok_or(SkipperError::NoEndpoints)
    }
}
