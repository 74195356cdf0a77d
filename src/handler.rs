use crate::breadcrumb::Breadcrumb;
use crate::client::{BreadcrumbClient, ClientError};
use crate::formatter::{LineFormatter, RecordFormatter};
use crate::record::LogRecord;
use crate::severity::Severity;
use std::sync::{Arc, OnceLock};

/// Context key under which the rendered batch summary is stored.
pub const LOGS_CONTEXT_KEY: &str = "logs";

/// Callback applied to every record that passes the threshold, before it is
/// rendered or emitted.
pub type Processor = Box<dyn Fn(LogRecord) -> LogRecord + Send + Sync>;

/// Construction-time settings of a [`BreadcrumbHandler`].
///
/// **Fields**
/// - `level`: minimum [`Severity`] a record needs to be considered.
/// - `bubble`: when `false`, [`BreadcrumbHandler::handle`] reports handled
///   records as final so callers stop passing them to further handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerConfig {
    pub level: Severity,
    pub bubble: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            level: Severity::Debug,
            bubble: true,
        }
    }
}

/// Consolidates bursts of [`LogRecord`]s into a single breadcrumb.
///
/// For each batch the handler keeps the records at or above its threshold,
/// picks the most severe one as the primary record, renders every kept
/// record (primary included) through the batch formatter into
/// `context["logs"]` of the primary, and records exactly one
/// [`Breadcrumb`] for it.
///
/// Ties on severity are resolved in favour of the first record in batch
/// order, so consolidating the same batch twice always picks the same
/// primary.
pub struct BreadcrumbHandler {
    client: Arc<dyn BreadcrumbClient>,
    level: Severity,
    bubble: bool,
    processors: Vec<Processor>,
    formatter: OnceLock<Box<dyn RecordFormatter>>,
    batch_formatter: OnceLock<Box<dyn RecordFormatter>>,
}

impl BreadcrumbHandler {
    pub fn new(client: Arc<dyn BreadcrumbClient>, config: HandlerConfig) -> Self {
        Self {
            client,
            level: config.level,
            bubble: config.bubble,
            processors: Vec::new(),
            formatter: OnceLock::new(),
            batch_formatter: OnceLock::new(),
        }
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn bubble(&self) -> bool {
        self.bubble
    }

    pub fn is_handling(&self, level: Severity) -> bool {
        level >= self.level
    }

    /// Replace the formatter that renders the emitted breadcrumb message.
    pub fn set_formatter(&mut self, formatter: impl RecordFormatter + 'static) {
        self.formatter = OnceLock::from(Box::new(formatter) as Box<dyn RecordFormatter>);
    }

    pub fn with_formatter(mut self, formatter: impl RecordFormatter + 'static) -> Self {
        self.set_formatter(formatter);
        self
    }

    /// Replace the formatter that renders each record of the batch summary.
    pub fn set_batch_formatter(&mut self, formatter: impl RecordFormatter + 'static) {
        self.batch_formatter = OnceLock::from(Box::new(formatter) as Box<dyn RecordFormatter>);
    }

    pub fn with_batch_formatter(mut self, formatter: impl RecordFormatter + 'static) -> Self {
        self.set_batch_formatter(formatter);
        self
    }

    /// Formatter for the emitted message; `%message%` unless overridden.
    pub fn formatter(&self) -> &dyn RecordFormatter {
        self.formatter
            .get_or_init(|| Box::new(LineFormatter::new("%message%")) as Box<dyn RecordFormatter>)
            .as_ref()
    }

    /// Formatter for summary lines; [`LineFormatter::default`] unless overridden.
    pub fn batch_formatter(&self) -> &dyn RecordFormatter {
        self.batch_formatter
            .get_or_init(|| Box::new(LineFormatter::default()) as Box<dyn RecordFormatter>)
            .as_ref()
    }

    /// Append a processor. Processors run in insertion order.
    pub fn push_processor<F>(&mut self, processor: F)
    where
        F: Fn(LogRecord) -> LogRecord + Send + Sync + 'static,
    {
        self.processors.push(Box::new(processor));
    }

    pub fn with_processor<F>(mut self, processor: F) -> Self
    where
        F: Fn(LogRecord) -> LogRecord + Send + Sync + 'static,
    {
        self.push_processor(processor);
        self
    }

    /// Handle one record as a batch of one.
    ///
    /// **Returns**
    /// - `Ok(false)` if the record is below the threshold, or if it was
    ///   handled and may bubble to further handlers.
    /// - `Ok(true)` if it was handled and `bubble` is off.
    /// - `Err(..)` with the client's error, unchanged.
    pub fn handle(&self, record: LogRecord) -> Result<bool, ClientError> {
        if !self.is_handling(record.level) {
            return Ok(false);
        }

        self.handle_batch(vec![record])?;
        Ok(!self.bubble)
    }

    /// Consolidate `records` and record at most one breadcrumb.
    ///
    /// A batch with nothing at or above the threshold is a silent no-op.
    pub fn handle_batch(&self, records: Vec<LogRecord>) -> Result<(), ClientError> {
        let received = records.len();
        match self.consolidate(records) {
            Some(primary) => self.emit(primary),
            None => {
                tracing::trace!(received, threshold = %self.level, "batch filtered to nothing");
                Ok(())
            }
        }
    }

    /// Filter, select and summarize a batch without emitting anything.
    ///
    /// Returns the primary record with the rendered summary stored under
    /// [`LOGS_CONTEXT_KEY`], or `None` when no record passes the threshold.
    pub fn consolidate(&self, records: Vec<LogRecord>) -> Option<LogRecord> {
        let mut records: Vec<LogRecord> = records
            .into_iter()
            .filter(|record| self.is_handling(record.level))
            .map(|record| self.process(record))
            .collect();

        let index = primary_index(&records)?;
        let summary = self.batch_formatter().format_batch(&records);

        let mut primary = records.swap_remove(index);
        if !summary.is_empty() {
            primary
                .context
                .insert(LOGS_CONTEXT_KEY.to_string(), serde_json::Value::String(summary));
        }
        Some(primary)
    }

    fn process(&self, record: LogRecord) -> LogRecord {
        self.processors
            .iter()
            .fold(record, |record, processor| processor(record))
    }

    fn emit(&self, mut record: LogRecord) -> Result<(), ClientError> {
        record.formatted = Some(self.formatter().format(&record));
        let breadcrumb = Breadcrumb::from_record(&record);

        tracing::debug!(
            level = %breadcrumb.level,
            category = %breadcrumb.category,
            "recording breadcrumb"
        );
        self.client.record_breadcrumb(breadcrumb)
    }
}

/// Index of the first record carrying the highest severity.
fn primary_index(records: &[LogRecord]) -> Option<usize> {
    let mut best: Option<(usize, Severity)> = None;
    for (index, record) in records.iter().enumerate() {
        match best {
            Some((_, level)) if record.level <= level => {}
            _ => best = Some((index, record.level)),
        }
    }
    best.map(|(index, _)| index)
}
