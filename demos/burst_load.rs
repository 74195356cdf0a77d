use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::error;

use breadcrumb_bridge::client::NoopClient;
use breadcrumb_bridge::init::{init_tracing_with_config, LayerConfig};
use breadcrumb_bridge::handler::HandlerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let layer_config = LayerConfig {
        channel_buffer: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        enable_stdout: false,
    };

    init_tracing_with_config(Arc::new(NoopClient), HandlerConfig::default(), layer_config)?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "burst load test error");
    }

    let elapsed = start.elapsed();
    println!("burst load: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    sleep(Duration::from_secs(2)).await;
    Ok(())
}
