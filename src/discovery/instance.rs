//! 服务实例定义

use serde::{Deserialize, Serialize};

/// 服务实例
///
/// 实例由注册中心事件创建、更新和删除，客户端从不修改实例
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceInstance {
    /// 服务名（如 "skipper"）
    pub service: String,

    /// 实例 ID（注册中心内唯一）
    pub instance_id: String,

    /// 服务地址（`host:port`），也是端点集合中实例的身份
    pub address: String,

    /// 标签
    pub tags: Vec<String>,

    /// 健康检查是否全部通过
    pub healthy: bool,
}

impl ServiceInstance {
    /// 创建新的服务实例（默认健康、无标签）
    pub fn new(
        service: impl Into<String>,
        instance_id: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            instance_id: instance_id.into(),
            address: address.into(),
            tags: Vec::new(),
            healthy: true,
        }
    }

    /// 添加标签
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// 设置健康状态
    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// 检查是否带有全部要求的标签
    pub fn matches_tags(&self, required: &[String]) -> bool {
        required.iter().all(|tag| self.tags.contains(tag))
    }

    /// 检查实例是否满足订阅条件
    pub fn matches(&self, service: &str, tags: &[String], passing_only: bool) -> bool {
        self.service == service && self.matches_tags(tags) && (!passing_only || self.healthy)
    }
}
