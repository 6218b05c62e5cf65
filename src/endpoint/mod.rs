//! 端点抽象
//!
//! 端点（Endpoint）是绑定到某一个实例、某一个操作的可调用对象。
//! 负载均衡器在端点集合中选择，重试包装器本身也是一个端点，因此可以像普通端点一样组合。
//!
//! - [`Operation`]：操作描述符，九个固定的命名操作
//! - [`Request`] / [`Response`]：每个操作一个变体，请求可克隆以便重试时重放
//! - [`Factory`]：实例地址 → 端点（以及可选的 [`Closer`]）
//! - [`make_endpoint`]：把一个 `ProfileService` 的某个操作包装成端点

pub mod operation;

pub use operation::{Operation, Request, Response};

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::error::{Result, SkipperError};
use crate::service::ProfileService;

/// 端点 trait
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, request: Request) -> Result<Response>;
}

/// 端点持有的可释放资源（例如长连接）
///
/// 实例从端点集合中移除时由 Endpointer 调用
pub trait Closer: Send + Sync {
    fn close(&self);
}

/// 工厂输出：端点 + 可选的资源释放器
pub type FactoryOutput = (Arc<dyn Endpoint>, Option<Box<dyn Closer>>);

/// 端点工厂
///
/// 给定实例地址（`host:port`）构建端点；失败时该实例被排除在可用集合之外
pub trait Factory: Send + Sync {
    fn make(&self, instance: &str) -> Result<FactoryOutput>;
}

impl<F> Factory for F
where
    F: Fn(&str) -> Result<FactoryOutput> + Send + Sync,
{
    fn make(&self, instance: &str) -> Result<FactoryOutput> {
        self(instance)
    }
}

/// 由闭包实现的端点
pub struct EndpointFn<F> {
    f: F,
}

/// 用闭包创建端点
///
/// ```rust,no_run
/// use skipper::endpoint::{endpoint_fn, Response};
///
/// let ep = endpoint_fn(|_req| async { Ok(Response::Empty) });
/// ```
pub fn endpoint_fn<F, Fut>(f: F) -> EndpointFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    EndpointFn { f }
}

#[async_trait]
impl<F, Fut> Endpoint for EndpointFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    async fn call(&self, request: Request) -> Result<Response> {
        (self.f)(request).await
    }
}

/// 绑定到某个服务实现、某个操作的端点
pub struct ServiceEndpoint<S> {
    operation: Operation,
    service: S,
}

/// 把服务的某个操作包装成端点
///
/// 请求的操作与端点的操作不一致时返回 `BadRequest`，不会调用服务
pub fn make_endpoint<S>(operation: Operation, service: S) -> Arc<dyn Endpoint>
where
    S: ProfileService + 'static,
{
    Arc::new(ServiceEndpoint { operation, service })
}

#[async_trait]
impl<S> Endpoint for ServiceEndpoint<S>
where
    S: ProfileService,
{
    async fn call(&self, request: Request) -> Result<Response> {
        if request.operation() != self.operation {
            return Err(SkipperError::BadRequest(format!(
                "{} endpoint cannot serve {} request",
                self.operation,
                request.operation()
            )));
        }

        let svc = &self.service;
        match request {
            Request::PostProfile { profile } => {
                svc.post_profile(profile).await.map(|_| Response::Empty)
            }
            Request::GetProfile { id } => svc.get_profile(&id).await.map(Response::Profile),
            Request::PutProfile { id, profile } => {
                svc.put_profile(&id, profile).await.map(|_| Response::Empty)
            }
            Request::PatchProfile { id, profile } => {
                svc.patch_profile(&id, profile).await.map(|_| Response::Empty)
            }
            Request::DeleteProfile { id } => {
                svc.delete_profile(&id).await.map(|_| Response::Empty)
            }
            Request::GetAddresses { profile_id } => svc
                .get_addresses(&profile_id)
                .await
                .map(Response::Addresses),
            Request::GetAddress {
                profile_id,
                address_id,
            } => svc
                .get_address(&profile_id, &address_id)
                .await
                .map(Response::Address),
            Request::PostAddress {
                profile_id,
                address,
            } => svc
                .post_address(&profile_id, address)
                .await
                .map(|_| Response::Empty),
            Request::DeleteAddress {
                profile_id,
                address_id,
            } => svc
                .delete_address(&profile_id, &address_id)
                .await
                .map(|_| Response::Empty),
        }
    }
}
