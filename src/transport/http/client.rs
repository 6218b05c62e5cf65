//! HTTP 客户端：通过 HTTP 调用单个远端实例的资料服务

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{AddressResponse, AddressesResponse, EmptyResponse, ErrorBody, ProfileResponse};
use crate::error::{Result, SkipperError};
use crate::service::{Address, Profile, ProfileService};

/// 单实例 HTTP 客户端
#[derive(Clone, Debug)]
pub struct HttpClient {
    http: reqwest::Client,
    base: Url,
}

impl HttpClient {
    /// 使用新的连接池创建客户端
    pub fn new(instance: &str) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), instance)
    }

    /// 复用已有的连接池
    ///
    /// `instance` 可以是 `host:port`（默认 http）或完整 URL
    pub fn with_client(http: reqwest::Client, instance: &str) -> Result<Self> {
        let raw = if instance.contains("://") {
            instance.to_string()
        } else {
            format!("http://{}", instance)
        };

        let base = Url::parse(&raw)
            .map_err(|e| SkipperError::endpoint_construction(instance, e.to_string()))?;
        if base.cannot_be_a_base() || base.host_str().is_none_or(str::is_empty) {
            return Err(SkipperError::endpoint_construction(instance, "missing host"));
        }

        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// 拼接路径；`trailing_slash` 为 true 时以 `/` 结尾（集合路由）
    fn url(&self, segments: &[&str], trailing_slash: bool) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| SkipperError::transport("instance URL cannot be a base"))?;
            path.pop_if_empty();
            path.extend(segments);
            if trailing_slash {
                path.push("");
            }
        }
        Ok(url)
    }

    async fn send<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut req = self.http.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .map(|b| b.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(SkipperError::from_http(status.as_u16(), message));
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ProfileService for HttpClient {
    async fn post_profile(&self, profile: Profile) -> Result<()> {
        let url = self.url(&["profiles"], true)?;
        let _: EmptyResponse = self.send(Method::POST, url, Some(&profile)).await?;
        Ok(())
    }

    async fn get_profile(&self, id: &str) -> Result<Profile> {
        let url = self.url(&["profiles", id], false)?;
        let resp: ProfileResponse = self.send::<(), _>(Method::GET, url, None).await?;
        Ok(resp.profile)
    }

    async fn put_profile(&self, id: &str, profile: Profile) -> Result<()> {
        let url = self.url(&["profiles", id], false)?;
        let _: EmptyResponse = self.send(Method::PUT, url, Some(&profile)).await?;
        Ok(())
    }

    async fn patch_profile(&self, id: &str, profile: Profile) -> Result<()> {
        let url = self.url(&["profiles", id], false)?;
        let _: EmptyResponse = self.send(Method::PATCH, url, Some(&profile)).await?;
        Ok(())
    }

    async fn delete_profile(&self, id: &str) -> Result<()> {
        let url = self.url(&["profiles", id], false)?;
        let _: EmptyResponse = self.send::<(), _>(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn get_addresses(&self, profile_id: &str) -> Result<Vec<Address>> {
        let url = self.url(&["profiles", profile_id, "addresses"], true)?;
        let resp: AddressesResponse = self.send::<(), _>(Method::GET, url, None).await?;
        Ok(resp.addresses)
    }

    async fn get_address(&self, profile_id: &str, address_id: &str) -> Result<Address> {
        let url = self.url(&["profiles", profile_id, "addresses", address_id], false)?;
        let resp: AddressResponse = self.send::<(), _>(Method::GET, url, None).await?;
        Ok(resp.address)
    }

    async fn post_address(&self, profile_id: &str, address: Address) -> Result<()> {
        let url = self.url(&["profiles", profile_id, "addresses"], true)?;
        let _: EmptyResponse = self.send(Method::POST, url, Some(&address)).await?;
        Ok(())
    }

    async fn delete_address(&self, profile_id: &str, address_id: &str) -> Result<()> {
        let url = self.url(&["profiles", profile_id, "addresses", address_id], false)?;
        let _: EmptyResponse = self.send::<(), _>(Method::DELETE, url, None).await?;
        Ok(())
    }
}
