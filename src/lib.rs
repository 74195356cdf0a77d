pub mod severity;
pub mod record;
pub mod formatter;
pub mod breadcrumb;
pub mod client;
pub mod handler;
pub mod sink;
pub mod layer;

pub mod env;
pub mod init;

pub use breadcrumb::Breadcrumb;
pub use client::{BreadcrumbClient, Breadcrumbs, ClientError, JsonLinesClient, NoopClient};
pub use formatter::{LineFormatter, RecordFormatter};
pub use handler::{BreadcrumbHandler, HandlerConfig, LOGS_CONTEXT_KEY};
pub use layer::BreadcrumbLayer;
pub use record::LogRecord;
pub use severity::{BreadcrumbLevel, Severity};
pub use sink::BatchSink;
