use anyhow::Context;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::shared::config::{CONFIG, LoggingConfig};

const LOG_FILE_PREFIX: &str = "strata.log";

fn level(name: &str, value: &str) -> anyhow::Result<LevelFilter> {
    value
        .parse::<LevelFilter>()
        .with_context(|| format!("invalid {} log level {:?}", name, value))
}

/// Installs the global subscriber using the process-wide settings.
pub fn init() -> anyhow::Result<()> {
    init_with(&CONFIG.logging)
}

/// Colored output on stdout plus a daily-rolling plain file in `log_dir`.
/// An empty `log_dir` disables the file output.
pub fn init_with(cfg: &LoggingConfig) -> anyhow::Result<()> {
    let stdout = fmt::layer()
        .with_ansi(true)
        .with_filter(level("stdout", &cfg.stdout_level)?);

    let file = if cfg.log_dir.is_empty() {
        None
    } else {
        let appender = tracing_appender::rolling::daily(&cfg.log_dir, LOG_FILE_PREFIX);
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(appender)
                .with_filter(level("file", &cfg.file_level)?),
        )
    };

    tracing_subscriber::registry()
        .with(stdout)
        .with(file)
        .try_init()
        .context("global subscriber already installed")?;

    info!(target: "logging::init", log_dir = %cfg.log_dir, "Logging initialized");
    Ok(())
}

#[cfg(test)]
pub fn init_for_tests() {
    use std::sync::Once;
    use tracing_subscriber::EnvFilter;

    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::from_default_env().add_directive("strata_db=debug".parse().unwrap());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
