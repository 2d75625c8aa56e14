//! 日誌初始化

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化全域 tracing 訂閱者
///
/// 優先使用 `RUST_LOG`，未設定時使用 `default_filter`（例如 `"stock_fifo=info"`）。
/// 已初始化時回傳錯誤，不會覆蓋既有訂閱者。
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()?;

    Ok(())
}
