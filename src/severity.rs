use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Severity scale of the logging side, least to most severe.
///
/// Discriminants are the numeric codes used by syslog-style loggers, so
/// ordering a `Severity` orders by the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u16)]
pub enum Severity {
    Debug = 100,
    Info = 200,
    Notice = 250,
    Warning = 300,
    Error = 400,
    Critical = 500,
    Alert = 550,
    Emergency = 600,
}

/// Severity scale understood by the tracking client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreadcrumbLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Every level, least severe first.
    pub const ALL: [Severity; 8] = [
        Severity::Debug,
        Severity::Info,
        Severity::Notice,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
        Severity::Alert,
        Severity::Emergency,
    ];

    pub const fn code(self) -> u16 {
        self as u16
    }

    pub const fn name(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Alert => "ALERT",
            Severity::Emergency => "EMERGENCY",
        }
    }

    /// Translate into the tracking client's scale.
    ///
    /// The match is exhaustive: adding a variant to [`Severity`] does not
    /// compile until it is given a target here.
    pub const fn to_breadcrumb_level(self) -> BreadcrumbLevel {
        match self {
            Severity::Debug => BreadcrumbLevel::Debug,
            Severity::Info | Severity::Notice => BreadcrumbLevel::Info,
            Severity::Warning => BreadcrumbLevel::Warning,
            Severity::Error => BreadcrumbLevel::Error,
            Severity::Critical | Severity::Alert | Severity::Emergency => BreadcrumbLevel::Fatal,
        }
    }
}

impl From<Severity> for BreadcrumbLevel {
    fn from(severity: Severity) -> Self {
        severity.to_breadcrumb_level()
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Severity::Error,
            tracing::Level::WARN => Severity::Warning,
            tracing::Level::INFO => Severity::Info,
            // DEBUG and TRACE
            _ => Severity::Debug,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl BreadcrumbLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            BreadcrumbLevel::Debug => "debug",
            BreadcrumbLevel::Info => "info",
            BreadcrumbLevel::Warning => "warning",
            BreadcrumbLevel::Error => "error",
            BreadcrumbLevel::Fatal => "fatal",
        }
    }
}

impl fmt::Display for BreadcrumbLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a [`Severity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown severity level: {0:?}")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "notice" => Ok(Severity::Notice),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            "critical" | "crit" => Ok(Severity::Critical),
            "alert" => Ok(Severity::Alert),
            "emergency" | "emerg" => Ok(Severity::Emergency),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}
