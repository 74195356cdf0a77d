use crate::record::LogRecord;
use serde_json::Value;
use std::collections::BTreeMap;

/// Renders [`LogRecord`]s into text.
///
/// Implementations must be pure: no I/O, no interior state that changes the
/// output between calls.
pub trait RecordFormatter: Send + Sync {
    /// Render a single record.
    fn format(&self, record: &LogRecord) -> String;

    /// Render several records as one block, in the given order.
    fn format_batch(&self, records: &[LogRecord]) -> String {
        records.iter().map(|record| self.format(record)).collect()
    }
}

/// Layout used when no template is given, one record per line.
pub const DEFAULT_LINE_FORMAT: &str =
    "[%datetime%] %channel%.%level_name%: %message% %context% %extra%\n";

/// `chrono` pattern used for `%datetime%`.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Template-driven single-line formatter.
///
/// Supported placeholders: `%datetime%`, `%channel%`, `%level_name%`,
/// `%message%`, `%context%`, `%extra%`, plus `%context.KEY%` and
/// `%extra.KEY%` for individual entries (rendered empty when the key is
/// absent). Unknown `%...%` sequences are left untouched.
#[derive(Debug, Clone)]
pub struct LineFormatter {
    format: String,
    date_format: String,
    allow_inline_line_breaks: bool,
    ignore_empty_context_and_extra: bool,
}

impl Default for LineFormatter {
    fn default() -> Self {
        LineFormatter::new(DEFAULT_LINE_FORMAT)
    }
}

impl LineFormatter {
    pub fn new(format: impl Into<String>) -> Self {
        LineFormatter {
            format: format.into(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            allow_inline_line_breaks: false,
            ignore_empty_context_and_extra: false,
        }
    }

    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    /// Keep `\n` inside rendered values instead of folding them to spaces.
    pub fn allow_inline_line_breaks(mut self, allow: bool) -> Self {
        self.allow_inline_line_breaks = allow;
        self
    }

    /// Render empty `%context%` / `%extra%` as nothing instead of `{}`.
    pub fn ignore_empty_context_and_extra(mut self, ignore: bool) -> Self {
        self.ignore_empty_context_and_extra = ignore;
        self
    }

    fn placeholder(&self, name: &str, record: &LogRecord) -> Option<String> {
        let value = match name {
            "datetime" => record.timestamp.format(&self.date_format).to_string(),
            "channel" => self.inline(&record.channel),
            "level_name" => record.level.name().to_string(),
            "message" => self.inline(&record.message),
            "context" => self.render_map(&record.context),
            "extra" => self.render_map(&record.extra),
            _ => {
                if let Some(key) = name.strip_prefix("context.") {
                    record.context.get(key).map(|v| self.scalar(v)).unwrap_or_default()
                } else if let Some(key) = name.strip_prefix("extra.") {
                    record.extra.get(key).map(|v| self.scalar(v)).unwrap_or_default()
                } else {
                    return None;
                }
            }
        };
        Some(value)
    }

    fn render_map(&self, map: &BTreeMap<String, Value>) -> String {
        if map.is_empty() && self.ignore_empty_context_and_extra {
            return String::new();
        }
        let json = serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string());
        self.inline(&json)
    }

    fn scalar(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => self.inline(s),
            other => self.inline(&other.to_string()),
        }
    }

    fn inline(&self, text: &str) -> String {
        if self.allow_inline_line_breaks {
            text.to_string()
        } else {
            text.replace("\r\n", " ").replace(&['\r', '\n'][..], " ")
        }
    }
}

impl RecordFormatter for LineFormatter {
    fn format(&self, record: &LogRecord) -> String {
        // Single pass over the template so substituted values are never
        // scanned for placeholders themselves.
        let mut out = String::with_capacity(self.format.len() + record.message.len());
        let mut rest = self.format.as_str();

        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('%') {
                Some(end) => match self.placeholder(&after[..end], record) {
                    Some(value) => {
                        out.push_str(&value);
                        rest = &after[end + 1..];
                    }
                    None => {
                        out.push('%');
                        rest = after;
                    }
                },
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}
