//! Skipper 错误处理模块
//!
//! 提供统一的错误类型与错误代码分类

pub mod code;
pub mod skipper_error;

pub use code::{ErrorCategory, ErrorCode};
pub use skipper_error::{Result, SkipperError};

/// 基础设施层（运行时、二进制入口）默认使用的结果类型
pub type InfraResult<T> = anyhow::Result<T>;
