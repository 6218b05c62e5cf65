//! Skipper 统一错误类型

use super::code::ErrorCode;
use std::time::Duration;
use thiserror::Error;

/// Skipper 统一错误类型
///
/// 业务错误的 `Display` 文本同时也是 HTTP 错误响应体中的 `error` 字段，
/// 客户端依靠该文本把远端错误还原成同一个变体
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipperError {
    /// 路径中的 ID 与请求体中的 ID 不一致
    #[error("inconsistent IDs")]
    InconsistentIds,

    /// 资源已存在
    #[error("already exists")]
    AlreadyExists,

    /// 资源不存在
    #[error("not found")]
    NotFound,

    /// 请求格式错误（无法解析的请求体、非法路由参数等）
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 注册中心不可达或返回了无法解析的应答
    #[error("discovery unavailable: {0}")]
    DiscoveryUnavailable(String),

    /// 端点工厂无法为某个实例构建端点
    #[error("endpoint construction failed for {instance}: {reason}")]
    EndpointConstruction { instance: String, reason: String },

    /// 负载均衡器当前没有可用端点
    #[error("no endpoints available")]
    NoEndpoints,

    /// 重试次数耗尽，包装最后一次失败的原因
    #[error("max retries exceeded after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: usize,
        source: Box<SkipperError>,
    },

    /// 重试时间预算耗尽，包装最后一次失败的原因
    #[error("retry timeout after {attempts} attempts ({elapsed:?}): {source}")]
    RetryTimeout {
        attempts: usize,
        elapsed: Duration,
        source: Box<SkipperError>,
    },

    /// 截止时间已过，尚无任何一次调用完成
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// 网络/编解码错误
    #[error("transport error: {0}")]
    Transport(String),

    /// 远端返回了无法还原为已知变体的错误
    #[error("remote error (status {status}): {message}")]
    Remote { status: u16, message: String },

    /// 内部错误
    #[error("internal error: {0}")]
    Internal(String),
}

impl SkipperError {
    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            SkipperError::InconsistentIds => ErrorCode::InconsistentIds,
            SkipperError::AlreadyExists => ErrorCode::AlreadyExists,
            SkipperError::NotFound => ErrorCode::NotFound,
            SkipperError::BadRequest(_) => ErrorCode::BadRequest,
            SkipperError::DiscoveryUnavailable(_) => ErrorCode::DiscoveryUnavailable,
            SkipperError::EndpointConstruction { .. } => ErrorCode::EndpointConstructionFailed,
            SkipperError::NoEndpoints => ErrorCode::NoEndpoints,
            SkipperError::RetryExhausted { .. } => ErrorCode::RetryExhausted,
            SkipperError::RetryTimeout { .. } => ErrorCode::RetryTimeout,
            SkipperError::DeadlineExceeded => ErrorCode::DeadlineExceeded,
            SkipperError::Transport(_) => ErrorCode::TransportError,
            SkipperError::Remote { .. } => ErrorCode::RemoteError,
            SkipperError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn discovery(msg: impl Into<String>) -> Self {
        SkipperError::DiscoveryUnavailable(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        SkipperError::Transport(msg.into())
    }

    pub fn endpoint_construction(instance: impl Into<String>, reason: impl Into<String>) -> Self {
        SkipperError::EndpointConstruction {
            instance: instance.into(),
            reason: reason.into(),
        }
    }

    /// 重试包装错误的最终原因（非重试错误返回自身）
    pub fn root_cause(&self) -> &SkipperError {
        match self {
            SkipperError::RetryExhausted { source, .. }
            | SkipperError::RetryTimeout { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// 从 HTTP 错误响应还原错误
    ///
    /// 业务错误按消息文本匹配，其余按状态码归类
    pub fn from_http(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match message.as_str() {
            "inconsistent IDs" => SkipperError::InconsistentIds,
            "already exists" => SkipperError::AlreadyExists,
            "not found" => SkipperError::NotFound,
            _ => SkipperError::Remote { status, message },
        }
    }
}

impl From<reqwest::Error> for SkipperError {
    fn from(err: reqwest::Error) -> Self {
        SkipperError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SkipperError {
    fn from(err: serde_json::Error) -> Self {
        SkipperError::Transport(format!("invalid JSON: {}", err))
    }
}

/// Skipper 结果类型
pub type Result<T> = std::result::Result<T, SkipperError>;
