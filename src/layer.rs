use crate::record::LogRecord;
use crate::severity::Severity;
use crate::sink::BatchSink;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Name of the field that can raise an event above what `tracing` levels
/// express, e.g. `error!(severity = "critical", "disk full")`.
pub const SEVERITY_FIELD: &str = "severity";

/// Largest channel capacity the layer will allocate.
pub const MAX_CHANNEL_BUFFER: usize = 1 << 20;

/// Largest number of records consolidated in one batch.
pub const MAX_BATCH_SIZE: usize = 1 << 20;

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// hands bursts of them to a [`BatchSink`].
///
/// Records travel through a bounded channel to a background task, which
/// flushes when the batch is full, when no new record arrived for
/// `flush_interval`, and once more when the layer is dropped. Events
/// emitted by this crate itself are ignored.
pub struct BreadcrumbLayer {
    sender: mpsc::Sender<LogRecord>,
    min_level: Severity,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
}

impl BreadcrumbLayer {
    /// Create a new layer and spawn the background task that drains the
    /// channel into `sink`.
    ///
    /// `buffer` and `batch_size` are clamped to `16..=MAX_CHANNEL_BUFFER` and
    /// `1..=MAX_BATCH_SIZE`, `flush_interval` to at least 10ms. Must be called
    /// from within a Tokio runtime.
    pub fn new(
        sink: Arc<dyn BatchSink>,
        buffer: usize,
        batch_size: usize,
        flush_interval: Duration,
    ) -> (Self, JoinHandle<()>) {
        let buffer = buffer.clamp(16, MAX_CHANNEL_BUFFER);
        let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        let flush_interval = flush_interval.max(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::channel::<LogRecord>(buffer);

        let handle = tokio::spawn(async move {
            let mut batch = Vec::with_capacity(batch_size.min(1024));

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(record) => {
                            batch.push(record);
                            if batch.len() >= batch_size {
                                flush(&*sink, &mut batch).await;
                            }
                        }
                        None => {
                            if !batch.is_empty() {
                                flush(&*sink, &mut batch).await;
                            }
                            break;
                        }
                    },
                    _ = sleep(flush_interval) => {
                        if !batch.is_empty() {
                            flush(&*sink, &mut batch).await;
                        }
                    }
                }
            }
        });

        (Self {
            sender: tx,
            min_level: Severity::Debug,
            total_events: Arc::new(AtomicU64::new(0)),
            enqueued_events: Arc::new(AtomicU64::new(0)),
            dropped_events: Arc::new(AtomicU64::new(0)),
        }, handle)
    }

    /// Skip events below `level` before they reach the channel.
    pub fn with_min_level(mut self, level: Severity) -> Self {
        self.min_level = level;
        self
    }
}

async fn flush(sink: &dyn BatchSink, batch: &mut Vec<LogRecord>) {
    let records = std::mem::take(batch);
    let count = records.len();
    if let Err(e) = sink.send_batch(records).await {
        tracing::warn!(error = %e, records = count, "log batch rejected by sink, dropping it");
    }
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

impl<S> Layer<S> for BreadcrumbLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let meta = event.metadata();
        if is_own_target(meta.target()) {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut severity: Option<Severity> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
            severity: &mut severity,
        };
        event.record(&mut visitor);

        let level = severity.unwrap_or_else(|| Severity::from(*meta.level()));
        if level < self.min_level {
            return;
        }

        let mut extra = BTreeMap::new();
        if let Some(module_path) = meta.module_path() {
            extra.insert("module_path".to_string(), serde_json::Value::from(module_path));
        }
        if let Some(file) = meta.file() {
            extra.insert("file".to_string(), serde_json::Value::from(file));
        }
        if let Some(line) = meta.line() {
            extra.insert("line".to_string(), serde_json::Value::from(line));
        }

        let record = LogRecord {
            timestamp: Utc::now(),
            level,
            channel: meta.target().to_string(),
            message: message.unwrap_or_default(),
            context: fields,
            extra,
            formatted: None,
        };

        match self.sender.try_send(record) {
            Ok(()) => {
                self.enqueued_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(_e) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("breadcrumb channel full, dropping log record");
            }
        }
    }
}

/// Collects event fields into the record's message, context and severity.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
    pub severity: &'a mut Option<Severity>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => *self.message = Some(value.to_string()),
            SEVERITY_FIELD if value.parse::<Severity>().is_ok() => {
                *self.severity = value.parse().ok();
            }
            name => {
                self.fields.insert(name.to_string(), serde_json::Value::String(value.to_string()));
            }
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // Plain `error!("text")` messages arrive here as `fmt::Arguments`.
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_target_matches_crate_and_submodules_only() {
        assert!(is_own_target(OWN_TARGET));
        assert!(is_own_target(&format!("{}::handler", OWN_TARGET)));
        assert!(!is_own_target(&format!("{}_ext::handler", OWN_TARGET)));
        assert!(!is_own_target("app"));
    }
}
