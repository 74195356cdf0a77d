use crate::client::BreadcrumbClient;
use crate::env::{handler_config_from_env, layer_config_from_env, EnvConfigError};
use crate::handler::{BreadcrumbHandler, HandlerConfig};
use crate::layer::BreadcrumbLayer;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Buffering and batching settings of the [`BreadcrumbLayer`].
///
/// **Fields**
/// - `channel_buffer`: maximum number of records queued before new ones
///   are dropped.
/// - `batch_size`: number of records that forces a consolidation.
/// - `flush_interval`: idle time after which a partial batch is
///   consolidated anyway.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer is
///   installed next to the breadcrumb layer.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            enable_stdout: true,
        }
    }
}

/// Error returned when the global subscriber cannot be installed.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to install global subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),

    #[error(transparent)]
    Env(#[from] EnvConfigError),
}

/// Install a global `tracing` subscriber that forwards consolidated
/// bursts through `handler`.
///
/// **Returns**
/// - the [`JoinHandle`] of the layer's background task.
/// - `Err(..)` if a global subscriber is already set.
///
/// Must be called from within a Tokio runtime.
pub fn init_tracing_with_handler(
    handler: BreadcrumbHandler,
    config: LayerConfig,
) -> Result<JoinHandle<()>, InitError> {
    let min_level = handler.level();
    let (layer, handle) = BreadcrumbLayer::new(
        Arc::new(handler),
        config.channel_buffer,
        config.batch_size,
        config.flush_interval,
    );
    let layer = layer.with_min_level(min_level);

    // The two subscriber shapes have different types, hence two branches.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(handle)
}

/// Build a [`BreadcrumbHandler`] for `client` and install it globally.
///
/// Must be called from within a Tokio runtime.
pub fn init_tracing_with_config(
    client: Arc<dyn BreadcrumbClient>,
    handler_config: HandlerConfig,
    config: LayerConfig,
) -> Result<JoinHandle<()>, InitError> {
    init_tracing_with_handler(BreadcrumbHandler::new(client, handler_config), config)
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to [`init_tracing_with_config`] with
/// [`HandlerConfig::default`] and [`LayerConfig::default`]. Must be called
/// from within a Tokio runtime.
pub fn init_tracing(client: Arc<dyn BreadcrumbClient>) -> Result<JoinHandle<()>, InitError> {
    init_tracing_with_config(client, HandlerConfig::default(), LayerConfig::default())
}

/// Initialize tracing with settings read from the `BREADCRUMB_*`
/// environment variables, see [`crate::env`]. Must be called from within a
/// Tokio runtime.
pub fn init_tracing_from_env(client: Arc<dyn BreadcrumbClient>) -> Result<JoinHandle<()>, InitError> {
    let handler_config = handler_config_from_env()?;
    let config = layer_config_from_env()?;
    init_tracing_with_config(client, handler_config, config)
}
