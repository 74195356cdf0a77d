use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use breadcrumb_bridge::{
    BatchSink, BreadcrumbClient, BreadcrumbHandler, BreadcrumbLayer, BreadcrumbLevel,
    Breadcrumbs, ClientError, HandlerConfig, LogRecord, Severity, LOGS_CONTEXT_KEY,
};
use tokio::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Keeps every batch it receives.
#[derive(Default)]
struct CapturingSink {
    batches: Mutex<Vec<Vec<LogRecord>>>,
}

#[async_trait]
impl BatchSink for CapturingSink {
    async fn send_batch(&self, records: Vec<LogRecord>) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.batches.lock().unwrap().push(records);
        Ok(())
    }
}

/// Fails every call and counts how often it was asked.
#[derive(Default)]
struct DownClient {
    calls: AtomicUsize,
}

impl BreadcrumbClient for DownClient {
    fn record_breadcrumb(&self, _breadcrumb: breadcrumb_bridge::Breadcrumb) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ClientError::Rejected("service unavailable".to_string()))
    }
}

fn long_idle() -> Duration {
    Duration::from_secs(30)
}

#[tokio::test]
async fn burst_becomes_one_breadcrumb() {
    let trail = Arc::new(Breadcrumbs::default());
    let handler = BreadcrumbHandler::new(trail.clone(), HandlerConfig::default());
    let (layer, handle) = BreadcrumbLayer::new(Arc::new(handler), 64, 100, long_idle());

    let subscriber = Registry::default().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        info!(target: "app", "started");
        error!(target: "db", "conn failed");
        warn!(target: "app", "slow");
    });

    // Dropping the subscriber closes the channel; the task flushes and exits.
    handle.await.unwrap();

    let crumbs = trail.fetch();
    assert_eq!(crumbs.len(), 1);
    assert_eq!(crumbs[0].level, BreadcrumbLevel::Error);
    assert_eq!(crumbs[0].category, "db");
    assert_eq!(crumbs[0].message, "conn failed");
}

#[tokio::test]
async fn events_become_records_with_context_and_extra() {
    let sink = Arc::new(CapturingSink::default());
    let (layer, handle) = BreadcrumbLayer::new(sink.clone(), 64, 100, long_idle());

    let subscriber = Registry::default().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        warn!(target: "checkout", order_id = 42u64, retry = true, reason = "timeout", "payment slow");
        error!(target: "billing", severity = "critical", "card processor down");
        error!(target: "billing", severity = "meh", "unknown override");
    });
    handle.await.unwrap();

    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    let records = &batches[0];
    assert_eq!(records.len(), 3);

    let slow = &records[0];
    assert_eq!(slow.level, Severity::Warning);
    assert_eq!(slow.channel, "checkout");
    assert_eq!(slow.message, "payment slow");
    assert_eq!(slow.context["order_id"], 42);
    assert_eq!(slow.context["retry"], true);
    assert_eq!(slow.context["reason"], "timeout");
    assert!(slow.extra.contains_key("line"));

    assert_eq!(records[1].level, Severity::Critical);
    assert!(!records[1].context.contains_key("severity"));

    assert_eq!(records[2].level, Severity::Error);
    assert_eq!(records[2].context["severity"], "meh");
}

#[tokio::test]
async fn batch_size_splits_bursts() {
    let sink = Arc::new(CapturingSink::default());
    let (layer, handle) = BreadcrumbLayer::new(sink.clone(), 64, 2, long_idle());

    let subscriber = Registry::default().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        for i in 0..5 {
            error!(target: "app", iteration = i, "failure");
        }
    });
    handle.await.unwrap();

    let sizes: Vec<usize> = sink.batches.lock().unwrap().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
}

#[tokio::test]
async fn full_channel_drops_and_counts() {
    let sink = Arc::new(CapturingSink::default());
    let (layer, handle) = BreadcrumbLayer::new(sink.clone(), 1, 1000, long_idle());
    let total = Arc::clone(&layer.total_events);
    let enqueued = Arc::clone(&layer.enqueued_events);
    let dropped = Arc::clone(&layer.dropped_events);

    // The background task cannot run while this closure holds the only
    // thread, so the channel fills up at its minimum capacity of 16.
    let subscriber = Registry::default().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        for i in 0..40 {
            error!(target: "app", iteration = i, "flood");
        }
    });
    handle.await.unwrap();

    assert_eq!(total.load(Ordering::Relaxed), 40);
    assert_eq!(enqueued.load(Ordering::Relaxed), 16);
    assert_eq!(dropped.load(Ordering::Relaxed), 24);
    assert_eq!(sink.batches.lock().unwrap()[0].len(), 16);
}

#[tokio::test]
async fn min_level_and_own_events_are_skipped() {
    let sink = Arc::new(CapturingSink::default());
    let (layer, handle) = BreadcrumbLayer::new(sink.clone(), 64, 100, long_idle());
    let layer = layer.with_min_level(Severity::Warning);

    let subscriber = Registry::default().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        info!(target: "app", "chatty");
        error!(target: "breadcrumb_bridge::handler", "internal");
        warn!(target: "app", "kept");
    });
    handle.await.unwrap();

    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0][0].message, "kept");
}

#[tokio::test]
async fn idle_interval_flushes_partial_batch() {
    let trail = Arc::new(Breadcrumbs::default());
    let handler = BreadcrumbHandler::new(trail.clone(), HandlerConfig::default());
    let (layer, handle) =
        BreadcrumbLayer::new(Arc::new(handler), 64, 100, Duration::from_millis(20));

    let dispatch = tracing::Dispatch::new(Registry::default().with(layer));
    tracing::dispatcher::with_default(&dispatch, || {
        error!(target: "app", "first burst");
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(trail.len(), 1);

    drop(dispatch);
    handle.await.unwrap();
    assert_eq!(trail.len(), 1);
}

#[tokio::test]
async fn client_failure_drops_the_batch_and_keeps_going() {
    let client = Arc::new(DownClient::default());
    let handler = BreadcrumbHandler::new(client.clone(), HandlerConfig::default());
    let (layer, handle) = BreadcrumbLayer::new(Arc::new(handler), 64, 1, long_idle());

    let subscriber = Registry::default().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        error!(target: "app", "one");
        error!(target: "app", "two");
    });

    handle.await.unwrap();

    // One attempt per batch: the second batch is still delivered after the
    // first fails, and neither is retried.
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn oversized_buffer_and_batch_are_clamped() {
    let sink = Arc::new(CapturingSink::default());
    let (layer, handle) = BreadcrumbLayer::new(sink.clone(), usize::MAX, usize::MAX, long_idle());

    let subscriber = Registry::default().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        error!(target: "app", "still flowing");
    });

    handle.await.unwrap();

    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0].message, "still flowing");
}

#[tokio::test]
async fn handler_as_sink_consolidates_each_batch() {
    let trail = Arc::new(Breadcrumbs::default());
    let handler = BreadcrumbHandler::new(trail.clone(), HandlerConfig::default());

    handler
        .send_batch(vec![
            LogRecord::new(Severity::Notice, "cache", "miss"),
            LogRecord::new(Severity::Emergency, "cluster", "split brain"),
        ])
        .await
        .unwrap();

    let crumbs = trail.fetch();
    assert_eq!(crumbs.len(), 1);
    assert_eq!(crumbs[0].level, BreadcrumbLevel::Fatal);

    let primary = handler
        .consolidate(vec![LogRecord::new(Severity::Emergency, "cluster", "split brain")])
        .unwrap();
    assert!(primary.context[LOGS_CONTEXT_KEY]
        .as_str()
        .unwrap()
        .contains("cluster.EMERGENCY: split brain"));
}
