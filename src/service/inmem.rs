//! 基于内存的资料服务实现（不持久化，进程重启后丢失）

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Address, Profile, ProfileService};
use crate::error::{Result, SkipperError};

/// 内存资料服务
#[derive(Clone, Default)]
pub struct InmemService {
    profiles: Arc<RwLock<HashMap<String, Profile>>>,
}

impl InmemService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前保存的资料数量
    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }
}

#[async_trait]
impl ProfileService for InmemService {
    async fn post_profile(&self, profile: Profile) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.id) {
            return Err(SkipperError::AlreadyExists);
        }
        profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn get_profile(&self, id: &str) -> Result<Profile> {
        let profiles = self.profiles.read().await;
        profiles.get(id).cloned().ok_or(SkipperError::NotFound)
    }

    async fn put_profile(&self, id: &str, profile: Profile) -> Result<()> {
        if id != profile.id {
            return Err(SkipperError::InconsistentIds);
        }
        let mut profiles = self.profiles.write().await;
        profiles.insert(id.to_string(), profile);
        Ok(())
    }

    async fn patch_profile(&self, id: &str, profile: Profile) -> Result<()> {
        if !profile.id.is_empty() && id != profile.id {
            return Err(SkipperError::InconsistentIds);
        }

        let mut profiles = self.profiles.write().await;
        let existing = profiles.get_mut(id).ok_or(SkipperError::NotFound)?;

        if !profile.name.is_empty() {
            existing.name = profile.name;
        }
        if !profile.addresses.is_empty() {
            existing.addresses = profile.addresses;
        }
        Ok(())
    }

    async fn delete_profile(&self, id: &str) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        profiles.remove(id).map(|_| ()).ok_or(SkipperError::NotFound)
    }

    async fn get_addresses(&self, profile_id: &str) -> Result<Vec<Address>> {
        let profiles = self.profiles.read().await;
        profiles
            .get(profile_id)
            .map(|p| p.addresses.clone())
            .ok_or(SkipperError::NotFound)
    }

    async fn get_address(&self, profile_id: &str, address_id: &str) -> Result<Address> {
        let profiles = self.profiles.read().await;
        let profile = profiles.get(profile_id).ok_or(SkipperError::NotFound)?;
        profile
            .addresses
            .iter()
            .find(|a| a.id == address_id)
            .cloned()
            .ok_or(SkipperError::NotFound)
    }

    async fn post_address(&self, profile_id: &str, address: Address) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(profile_id).ok_or(SkipperError::NotFound)?;
        if profile.addresses.iter().any(|a| a.id == address.id) {
            return Err(SkipperError::AlreadyExists);
        }
        profile.addresses.push(address);
        Ok(())
    }

    async fn delete_address(&self, profile_id: &str, address_id: &str) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(profile_id).ok_or(SkipperError::NotFound)?;
        let index = profile
            .addresses
            .iter()
            .position(|a| a.id == address_id)
            .ok_or(SkipperError::NotFound)?;
        profile.addresses.remove(index);
        Ok(())
    }
}
