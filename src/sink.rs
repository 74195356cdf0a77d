use crate::handler::BreadcrumbHandler;
use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for batches of [`LogRecord`]s collected by the
/// logging layer.
///
/// The layer calls `send_batch` from its background task, never from the
/// application thread that produced the events.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Deliver one batch.
    ///
    /// **Parameters**
    /// - `records`: records in arrival order. The batch may contain records
    ///   the sink does not care about; filtering is up to the sink.
    ///
    /// **Returns**
    /// - `Ok(())` if the batch was accepted.
    /// - `Err(..)` if delivery failed. The layer logs the failure and drops
    ///   the batch; it does not retry.
    async fn send_batch(&self, records: Vec<LogRecord>) -> Result<(), Box<dyn Error + Send + Sync>>;
}

#[async_trait]
impl BatchSink for BreadcrumbHandler {
    async fn send_batch(&self, records: Vec<LogRecord>) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.handle_batch(records)?;
        Ok(())
    }
}
