//! 传输层

pub mod http;
