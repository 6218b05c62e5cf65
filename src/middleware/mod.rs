//! 服务中间件
//!
//! 以 `tower::Layer` 的形式包装 `ProfileService`

pub mod logging;

pub use logging::{LoggingLayer, LoggingMiddleware};
