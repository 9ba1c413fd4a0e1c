//! Host Logging Abstractions
//!
//! Structured log entries and the sink trait used to mirror core logs into the
//! host's own logging pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{error::Result, platform::PlatformSendSync};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Target module/component
    pub target: String,
    pub message: String,
    /// Structured fields
    pub fields: HashMap<String, String>,
    /// Controller span the entry was recorded in, if any
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span_id: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }
}

/// Logger sink trait
///
/// Forwards structured logs from the playback core to the host, e.g. the
/// player's log window or the system journal.
///
/// # Security
///
/// Media locations may carry credentials. The core redacts `user:password@`
/// from URLs before logging them, but sinks that persist logs should still
/// apply their own privacy policy.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::logging::{LoggerSink, LogEntry, LogLevel};
///
/// async fn report(logger: &dyn LoggerSink, error: &str) {
///     let entry = LogEntry::new(LogLevel::Error, "core_playback", error)
///         .with_field("component", "controller");
///     logger.log(entry).await.ok();
/// }
/// ```
#[async_trait::async_trait]
pub trait LoggerSink: PlatformSendSync {
    /// Forward a log entry to the host logging system
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Flush any buffered logs
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Minimum level this sink wants to receive
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Console logger for development builds
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

#[async_trait::async_trait]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level < self.min_level {
            return Ok(());
        }

        println!(
            "[{}] {} {}: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.level.as_str(),
            entry.target,
            entry.message
        );

        if !entry.fields.is_empty() {
            println!("  Fields: {:?}", entry.fields);
        }
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}
