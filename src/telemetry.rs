//! 日志初始化
//!
//! - 过滤规则取自 `RUST_LOG`，缺省为 `info`
//! - `LOG_FORMAT=json` 时输出结构化 JSON，否则为可读文本

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::InfraResult;

/// 安装全局 tracing subscriber
///
/// 重复调用返回错误，不会替换已安装的 subscriber
pub fn init_tracing() -> InfraResult<()> {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    init_tracing_with(default_filter(), json)
}

pub fn init_tracing_with(filter: EnvFilter, json: bool) -> InfraResult<()> {
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
