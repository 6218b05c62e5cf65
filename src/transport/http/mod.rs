//! HTTP 传输层
//!
//! 服务端路由与客户端共用同一组 JSON 响应结构

pub mod client;
pub mod server;

pub use client::HttpClient;
pub use server::{ApiError, make_http_handler};

use serde::{Deserialize, Serialize};

use crate::service::{Address, Profile};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EmptyResponse {}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub profile: Profile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddressesResponse {
    #[serde(default)]
    pub addresses: Vec<Address>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddressResponse {
    pub address: Address,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
