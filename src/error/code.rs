//! 错误代码和错误类别定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
///
/// 错误代码按类别分组，每个类别占用1000个代码范围：
/// - 1000-1999: 业务领域错误（资料/地址）
/// - 2000-2999: 服务发现相关错误
/// - 3000-3999: 负载均衡与重试相关错误
/// - 4000-4999: 传输相关错误
/// - 6000-6999: 系统相关错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 业务领域错误 (1000-1999)
    // ============================================================
    InconsistentIds = 1000,
    AlreadyExists = 1001,
    NotFound = 1002,

    // ============================================================
    // 服务发现相关错误 (2000-2999)
    // ============================================================
    DiscoveryUnavailable = 2000,
    EndpointConstructionFailed = 2001,

    // ============================================================
    // 负载均衡与重试相关错误 (3000-3999)
    // ============================================================
    NoEndpoints = 3000,
    RetryExhausted = 3001,
    RetryTimeout = 3002,
    DeadlineExceeded = 3003,

    // ============================================================
    // 传输相关错误 (4000-4999)
    // ============================================================
    BadRequest = 4000,
    TransportError = 4001,
    RemoteError = 4002,

    // ============================================================
    // 系统相关错误 (6000-6999)
    // ============================================================
    InternalError = 6000,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InconsistentIds => "INCONSISTENT_IDS",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DiscoveryUnavailable => "DISCOVERY_UNAVAILABLE",
            ErrorCode::EndpointConstructionFailed => "ENDPOINT_CONSTRUCTION_FAILED",
            ErrorCode::NoEndpoints => "NO_ENDPOINTS",
            ErrorCode::RetryExhausted => "RETRY_EXHAUSTED",
            ErrorCode::RetryTimeout => "RETRY_TIMEOUT",
            ErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::TransportError => "TRANSPORT_ERROR",
            ErrorCode::RemoteError => "REMOTE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// 获取错误代码的类别
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Domain,
            2000..=2999 => ErrorCategory::Discovery,
            3000..=3999 => ErrorCategory::Balancer,
            4000..=4999 => ErrorCategory::Transport,
            _ => ErrorCategory::System,
        }
    }

    /// 对应的 HTTP 状态码（服务端编码错误响应时使用）
    pub fn http_status(&self) -> http::StatusCode {
        match self {
            ErrorCode::NotFound => http::StatusCode::NOT_FOUND,
            ErrorCode::AlreadyExists | ErrorCode::InconsistentIds | ErrorCode::BadRequest => {
                http::StatusCode::BAD_REQUEST
            }
            _ => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 判断错误是否来自调用链路本身（而不是业务结果）
    ///
    /// 重试包装器默认对所有错误重试；[`TransientOnly`](crate::lb::TransientOnly) 策略据此过滤
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorCode::NoEndpoints
                | ErrorCode::DeadlineExceeded
                | ErrorCode::TransportError
                | ErrorCode::RemoteError
                | ErrorCode::DiscoveryUnavailable
        )
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Domain,
    Discovery,
    Balancer,
    Transport,
    System,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Domain => write!(f, "DOMAIN"),
            ErrorCategory::Discovery => write!(f, "DISCOVERY"),
            ErrorCategory::Balancer => write!(f, "BALANCER"),
            ErrorCategory::Transport => write!(f, "TRANSPORT"),
            ErrorCategory::System => write!(f, "SYSTEM"),
        }
    }
}
