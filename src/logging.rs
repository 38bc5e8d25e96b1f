use std::env;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_DIR_ENV_VAR: &str = "LANBILLING_LOG_DIR";
const DEFAULT_LOG_DIR: &str = "logs";

/// Installs the global subscriber for one tool.
///
/// JSON lines go to a daily-rotated `<tool>.log`; human-readable output goes
/// to stderr because stdout carries CSV for the export tools. `RUST_LOG`
/// overrides the default `info` level.
pub fn init_logging(tool: &str) {
    let log_dir = env::var(LOG_DIR_ENV_VAR).unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
    let file_appender = rolling::daily(log_dir, format!("{tool}.log"));
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
}
