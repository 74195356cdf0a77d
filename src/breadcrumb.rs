use crate::record::LogRecord;
use crate::severity::BreadcrumbLevel;
use serde::Serialize;

/// Payload handed to a [`BreadcrumbClient`](crate::client::BreadcrumbClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub level: BreadcrumbLevel,
    pub category: String,
    pub message: String,
}

impl Breadcrumb {
    /// Build the payload for an already formatted record.
    ///
    /// The message is the record's formatted single-event text; batch
    /// summaries stay in `context["logs"]` and are not copied here.
    pub fn from_record(record: &LogRecord) -> Self {
        Breadcrumb {
            level: record.level.to_breadcrumb_level(),
            category: record.channel.clone(),
            message: record.formatted_message().to_string(),
        }
    }
}
