use crate::severity::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One structured log event as seen by the handler.
///
/// `context` carries caller-supplied fields, `extra` carries metadata added
/// by the capturing layer or by processors. `formatted` is filled by the
/// handler's event formatter right before the record is emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Severity,
    pub channel: String,
    pub message: String,
    pub context: BTreeMap<String, serde_json::Value>,
    pub extra: BTreeMap<String, serde_json::Value>,
    pub formatted: Option<String>,
}

impl LogRecord {
    pub fn new(level: Severity, channel: impl Into<String>, message: impl Into<String>) -> Self {
        LogRecord {
            timestamp: Utc::now(),
            level,
            channel: channel.into(),
            message: message.into(),
            context: BTreeMap::new(),
            extra: BTreeMap::new(),
            formatted: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Text sent as the event message: the formatted rendering when the
    /// handler produced one, the raw message otherwise.
    pub fn formatted_message(&self) -> &str {
        self.formatted.as_deref().unwrap_or(&self.message)
    }
}
