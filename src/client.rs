use crate::breadcrumb::Breadcrumb;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

/// Capacity used by [`Breadcrumbs::default`].
pub const DEFAULT_BREADCRUMB_CAPACITY: usize = 100;

/// Error returned by a [`BreadcrumbClient`].
///
/// The handler never inspects or retries these; they reach the caller of
/// `handle` / `handle_batch` unchanged.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("i/o error while recording breadcrumb: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize breadcrumb: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("breadcrumb rejected: {0}")]
    Rejected(String),
}

/// Handle on the error-tracking service.
///
/// Calls are synchronous. Implementations that are `Send + Sync` let one
/// handler be shared across threads without extra locking.
pub trait BreadcrumbClient: Send + Sync {
    /// Record one breadcrumb.
    fn record_breadcrumb(&self, breadcrumb: Breadcrumb) -> Result<(), ClientError>;
}

/// Bounded in-memory breadcrumb trail.
///
/// Once full, recording a new breadcrumb evicts the oldest one.
#[derive(Debug)]
pub struct Breadcrumbs {
    capacity: usize,
    buffer: Mutex<VecDeque<Breadcrumb>>,
}

impl Default for Breadcrumbs {
    fn default() -> Self {
        Breadcrumbs::with_capacity(DEFAULT_BREADCRUMB_CAPACITY)
    }
}

impl Breadcrumbs {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Breadcrumbs {
            capacity,
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, breadcrumb: Breadcrumb) {
        let mut buffer = self.lock();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(breadcrumb);
    }

    /// Snapshot of the trail, oldest first.
    pub fn fetch(&self) -> Vec<Breadcrumb> {
        self.lock().iter().cloned().collect()
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Breadcrumb>> {
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BreadcrumbClient for Breadcrumbs {
    fn record_breadcrumb(&self, breadcrumb: Breadcrumb) -> Result<(), ClientError> {
        self.record(breadcrumb);
        Ok(())
    }
}

/// A client that drops every breadcrumb.
///
/// Useful for measuring the overhead of consolidation alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopClient;

impl BreadcrumbClient for NoopClient {
    fn record_breadcrumb(&self, _breadcrumb: Breadcrumb) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Writes each breadcrumb as one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesClient<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesClient<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesClient {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> BreadcrumbClient for JsonLinesClient<W> {
    fn record_breadcrumb(&self, breadcrumb: Breadcrumb) -> Result<(), ClientError> {
        let mut line = serde_json::to_vec(&breadcrumb)?;
        line.push(b'\n');

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| ClientError::Rejected("writer lock poisoned".to_string()))?;
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}
