//! Structured logging for the `simlab` binary.
//!
//! Logs always go to stderr; stdout is reserved for the outcome.

use is_terminal::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive: trace, debug, info, warn, error, off, or `module=level` lists.
    pub level: String,
    /// text or json
    pub format: String,
    /// ANSI colors in text output; on only when stderr is a terminal.
    pub color: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            color: std::io::stderr().is_terminal(),
        }
    }
}

impl LoggingConfig {
    pub fn from_config(cfg: &Config) -> Self {
        let defaults = Self::default();
        Self {
            level: cfg.get("SIMLAB_LOG").unwrap_or(defaults.level),
            format: cfg.get("SIMLAB_LOG_FORMAT").unwrap_or(defaults.format),
            color: defaults.color,
        }
    }
}

/// Install the global subscriber. Fails if the format is unknown or a
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = build_env_filter(config)?;
    let base_subscriber = Registry::default().with(filter);

    match config.format.as_str() {
        "json" => base_subscriber
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init()?,
        "text" => base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(config.color)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        other => anyhow::bail!("Invalid log format: {} (must be 'json' or 'text')", other),
    }
    Ok(())
}

fn build_env_filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    let level = config.level.trim();
    if level.is_empty() {
        return Ok(EnvFilter::new("info"));
    }
    EnvFilter::try_new(level).map_err(|e| anyhow::anyhow!("Invalid log directive {}: {}", level, e))
}
