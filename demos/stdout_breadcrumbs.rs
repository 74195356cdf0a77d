use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use breadcrumb_bridge::client::JsonLinesClient;
use breadcrumb_bridge::handler::{BreadcrumbHandler, HandlerConfig};
use breadcrumb_bridge::init::{init_tracing_with_handler, LayerConfig};
use breadcrumb_bridge::severity::Severity;

/// Prints one JSON breadcrumb per consolidated burst. Only bursts that
/// contain at least one warning are reported.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Arc::new(JsonLinesClient::new(std::io::stdout()));
    let handler = BreadcrumbHandler::new(
        client,
        HandlerConfig {
            level: Severity::Warning,
            bubble: true,
        },
    );

    let config = LayerConfig {
        flush_interval: Duration::from_millis(200),
        enable_stdout: false,
        ..LayerConfig::default()
    };
    init_tracing_with_handler(handler, config)?;

    info!(target: "app", "service started");
    warn!(target: "db", latency_ms = 870, "slow query");
    error!(target: "db", host = "db-1", "connection refused");
    error!(target: "billing", severity = "critical", "card processor down");

    sleep(Duration::from_secs(1)).await;
    Ok(())
}
