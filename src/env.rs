//! Environment variable names used by this crate for convenient
//! configuration from services.
//!
//! These are purely helpers; the handler and layer types remain decoupled
//! from environment access. Unset variables fall back to the defaults of
//! [`HandlerConfig`] and [`LayerConfig`].

use crate::handler::HandlerConfig;
use crate::init::LayerConfig;
use crate::layer::{MAX_BATCH_SIZE, MAX_CHANNEL_BUFFER};
use crate::severity::Severity;
use tokio::time::Duration;

/// Minimum severity handled, e.g. `warning`.
pub const BREADCRUMB_MIN_LEVEL_ENV: &str = "BREADCRUMB_MIN_LEVEL";

/// Whether handled records bubble to further handlers (`true`/`false`).
pub const BREADCRUMB_BUBBLE_ENV: &str = "BREADCRUMB_BUBBLE";

/// Capacity of the layer's record channel, at most [`MAX_CHANNEL_BUFFER`].
pub const BREADCRUMB_CHANNEL_BUFFER_ENV: &str = "BREADCRUMB_CHANNEL_BUFFER";

/// Records per consolidated batch, at most [`MAX_BATCH_SIZE`].
pub const BREADCRUMB_BATCH_SIZE_ENV: &str = "BREADCRUMB_BATCH_SIZE";

/// Idle flush interval in milliseconds.
pub const BREADCRUMB_FLUSH_INTERVAL_MS_ENV: &str = "BREADCRUMB_FLUSH_INTERVAL_MS";

/// Whether to also print events to stdout (`true`/`false`).
pub const BREADCRUMB_STDOUT_ENV: &str = "BREADCRUMB_STDOUT";

/// Error returned when an environment variable holds an unusable value.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EnvConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

pub fn handler_config_from_env() -> Result<HandlerConfig, EnvConfigError> {
    handler_config_from(|key| std::env::var(key).ok())
}

pub fn layer_config_from_env() -> Result<LayerConfig, EnvConfigError> {
    layer_config_from(|key| std::env::var(key).ok())
}

/// Build a [`HandlerConfig`] from an arbitrary key lookup.
pub fn handler_config_from<F>(lookup: F) -> Result<HandlerConfig, EnvConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = HandlerConfig::default();

    if let Some(value) = lookup(BREADCRUMB_MIN_LEVEL_ENV) {
        config.level = value
            .parse::<Severity>()
            .map_err(|_| invalid(BREADCRUMB_MIN_LEVEL_ENV, value))?;
    }
    if let Some(value) = lookup(BREADCRUMB_BUBBLE_ENV) {
        config.bubble = parse_bool(BREADCRUMB_BUBBLE_ENV, value)?;
    }

    Ok(config)
}

/// Build a [`LayerConfig`] from an arbitrary key lookup.
pub fn layer_config_from<F>(lookup: F) -> Result<LayerConfig, EnvConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = LayerConfig::default();

    if let Some(value) = lookup(BREADCRUMB_CHANNEL_BUFFER_ENV) {
        config.channel_buffer = parse_size(BREADCRUMB_CHANNEL_BUFFER_ENV, value, MAX_CHANNEL_BUFFER)?;
    }
    if let Some(value) = lookup(BREADCRUMB_BATCH_SIZE_ENV) {
        config.batch_size = parse_size(BREADCRUMB_BATCH_SIZE_ENV, value, MAX_BATCH_SIZE)?;
    }
    if let Some(value) = lookup(BREADCRUMB_FLUSH_INTERVAL_MS_ENV) {
        config.flush_interval =
            Duration::from_millis(parse_number(BREADCRUMB_FLUSH_INTERVAL_MS_ENV, value)?);
    }
    if let Some(value) = lookup(BREADCRUMB_STDOUT_ENV) {
        config.enable_stdout = parse_bool(BREADCRUMB_STDOUT_ENV, value)?;
    }

    Ok(config)
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, EnvConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_number(key: &'static str, value: String) -> Result<u64, EnvConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid(key, value))
}

fn parse_size(key: &'static str, value: String, max: usize) -> Result<usize, EnvConfigError> {
    let number = value.trim().parse::<u64>().ok().and_then(|n| usize::try_from(n).ok());
    match number {
        Some(n) if n <= max => Ok(n),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &'static str, value: String) -> EnvConfigError {
    EnvConfigError::Invalid { key, value }
}
