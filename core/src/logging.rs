// 日志初始化 - tracing + EnvFilter，供宿主程序调用

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "deepreview_core=info";

/// Installs a fmt subscriber filtered by `RUST_LOG`, or `deepreview_core=info` when unset.
/// Returns `false` when a global subscriber is already installed.
pub fn init_tracing() -> bool {
    init_tracing_with(DEFAULT_FILTER)
}

pub fn init_tracing_with(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
