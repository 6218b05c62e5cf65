//! 资料服务
//!
//! 定义资料服务的九个操作，以及一个基于内存的实现。
//! 客户端（`client::Endpoints`）、日志装饰器（`middleware::LoggingMiddleware`）
//! 和 HTTP 客户端（`transport::http::HttpClient`）都实现同一个 trait，
//! 因此调用方不关心操作是在本地执行还是经过负载均衡发往远端。

pub mod inmem;
pub mod model;

pub use inmem::InmemService;
pub use model::{Address, Profile};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// 资料服务 trait
///
/// 注意：由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait ProfileService: Send + Sync {
    /// 创建资料，ID 已存在时返回 `AlreadyExists`
    async fn post_profile(&self, profile: Profile) -> Result<()>;

    async fn get_profile(&self, id: &str) -> Result<Profile>;

    /// 创建或整体替换资料，路径 ID 与资料 ID 不一致时返回 `InconsistentIds`
    async fn put_profile(&self, id: &str, profile: Profile) -> Result<()>;

    /// 局部更新：只覆盖非空的 `name` 与非空的 `addresses`
    async fn patch_profile(&self, id: &str, profile: Profile) -> Result<()>;

    async fn delete_profile(&self, id: &str) -> Result<()>;

    async fn get_addresses(&self, profile_id: &str) -> Result<Vec<Address>>;

    async fn get_address(&self, profile_id: &str, address_id: &str) -> Result<Address>;

    async fn post_address(&self, profile_id: &str, address: Address) -> Result<()>;

    async fn delete_address(&self, profile_id: &str, address_id: &str) -> Result<()>;
}

#[async_trait]
impl<S> ProfileService for Arc<S>
where
    S: ProfileService + ?Sized,
{
    async fn post_profile(&self, profile: Profile) -> Result<()> {
        (**self).post_profile(profile).await
    }

    async fn get_profile(&self, id: &str) -> Result<Profile> {
        (**self).get_profile(id).await
    }

    async fn put_profile(&self, id: &str, profile: Profile) -> Result<()> {
        (**self).put_profile(id, profile).await
    }

    async fn patch_profile(&self, id: &str, profile: Profile) -> Result<()> {
        (**self).patch_profile(id, profile).await
    }

    async fn delete_profile(&self, id: &str) -> Result<()> {
        (**self).delete_profile(id).await
    }

    async fn get_addresses(&self, profile_id: &str) -> Result<Vec<Address>> {
        (**self).get_addresses(profile_id).await
    }

    async fn get_address(&self, profile_id: &str, address_id: &str) -> Result<Address> {
        (**self).get_address(profile_id, address_id).await
    }

    async fn post_address(&self, profile_id: &str, address: Address) -> Result<()> {
        (**self).post_address(profile_id, address).await
    }

    async fn delete_address(&self, profile_id: &str, address_id: &str) -> Result<()> {
        (**self).delete_address(profile_id, address_id).await
    }
}
