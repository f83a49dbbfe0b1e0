//! Structured logging for the network speed monitor
//!
//! Provides leveled, structured log entries with correlation ids, a JSON mode
//! for debug runs, and specialised loggers for session lifecycles and errors.
//! All log output goes to stderr so stdout stays reserved for session events.

use crate::error::{AppError, Result};
use crate::models::{Config, FinalResult, ServerCandidate, StabilityReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

/// Shared logging context
#[derive(Debug, Default)]
struct LogContext {
    /// Process-wide run id
    run_id: Option<String>,
    /// Additional context fields
    context_fields: HashMap<String, serde_json::Value>,
}

/// Logger implementation with multiple output formats
///
/// Cloning is cheap; clones share the same context.
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    include_location: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            min_level: LogLevel::Warn,
            use_color: true,
            include_location: false,
            format: LogFormat::Console,
            name: name.into(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: impl Into<String>, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            include_location: config.debug,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name: name.into(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the run id attached to every entry
    pub async fn set_run_id(&self, run_id: String) {
        let mut context = self.context.write().await;
        context.run_id = Some(run_id);
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: String, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key, json_value);
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        self.attach_context(&mut entry).await;

        let output = self.render(&entry);
        let _ = writeln!(io::stderr(), "{}", output);
    }

    /// Copy the run id and shared context fields into `entry`
    async fn attach_context(&self, entry: &mut LogEntry) {
        let context = self.context.read().await;
        if let Some(run_id) = &context.run_id {
            entry
                .fields
                .insert("run_id".to_string(), serde_json::Value::String(run_id.clone()));
        }
        for (key, value) in &context.context_fields {
            entry.fields.insert(key.clone(), value.clone());
        }
    }

    /// Render an entry in the configured format
    pub fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
            LogFormat::Compact => self.format_compact(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}",
                entry.message
            ),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!(
            "{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
                location: None,
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Attach the key metrics of a finished pass
    pub fn metrics(self, result: &FinalResult) -> Self {
        self.field("ping_ms", result.ping)
            .field("jitter_ms", result.jitter)
            .field("download_mbps", result.download)
            .field("upload_mbps", result.upload)
            .field("server_id", &result.server.id)
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }

    #[cfg(test)]
    fn build(self) -> LogEntry {
        self.entry
    }
}

/// Lifecycle logger for measurement sessions
///
/// Every entry carries the session id as its correlation id.
#[derive(Clone)]
pub struct SessionLogger {
    logger: Logger,
}

impl SessionLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("SESSION", config),
        }
    }

    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub async fn log_session_started(&self, session_id: &str, kind: &str) {
        self.logger
            .info(&format!("Session {} started ({})", session_id, kind))
            .correlation_id(session_id)
            .field("kind", kind)
            .log()
            .await;
    }

    pub async fn log_server_selected(&self, session_id: &str, server: &ServerCandidate) {
        self.logger
            .debug(&format!("Selected server {} ({})", server.id, server.location()))
            .correlation_id(session_id)
            .field("server_id", &server.id)
            .field("host", &server.host)
            .field("distance_km", server.distance)
            .field("latency_ms", server.latency)
            .log()
            .await;
    }

    /// Log a probe outcome; failures are expected and logged at debug level
    pub async fn log_probe(&self, session_id: &str, server: &ServerCandidate, outcome: std::result::Result<Duration, &AppError>) {
        let builder = match outcome {
            Ok(latency) => self
                .logger
                .debug(&format!("Probe {} answered in {:.1}ms", server.host, latency.as_secs_f64() * 1000.0))
                .field("latency_ms", latency.as_secs_f64() * 1000.0),
            Err(error) => self
                .logger
                .debug(&format!("Probe {} failed: {}", server.host, error))
                .error_info(error),
        };

        builder
            .correlation_id(session_id)
            .field("server_id", &server.id)
            .log()
            .await;
    }

    pub async fn log_pass_complete(&self, session_id: &str, result: &FinalResult) {
        self.logger
            .info(&format!(
                "Pass complete: ping {:.2}ms, down {:.2}Mbps, up {:.2}Mbps",
                result.ping, result.download, result.upload
            ))
            .correlation_id(session_id)
            .metrics(result)
            .log()
            .await;
    }

    pub async fn log_pass_failed(&self, session_id: &str, error: &AppError) {
        self.logger
            .warn(&format!("Pass failed: {}", error))
            .correlation_id(session_id)
            .error_info(error)
            .log()
            .await;
    }

    pub async fn log_iteration(&self, session_id: &str, iteration: usize, progress: u8) {
        self.logger
            .debug(&format!("Iteration {} finished ({}%)", iteration, progress))
            .correlation_id(session_id)
            .field("iteration", iteration)
            .field("progress", progress)
            .log()
            .await;
    }

    pub async fn log_report(&self, session_id: &str, report: &StabilityReport) {
        self.logger
            .info(&format!(
                "Stability report: {} passes, score {:.2}",
                report.test_count, report.stability_score
            ))
            .correlation_id(session_id)
            .field("test_count", report.test_count)
            .field("stability_score", report.stability_score)
            .field("avg_download", report.avg_download)
            .field("avg_upload", report.avg_upload)
            .field("avg_ping", report.avg_ping)
            .log()
            .await;
    }

    pub async fn log_session_finished(&self, session_id: &str, state: &str) {
        self.logger
            .info(&format!("Session {} finished ({})", session_id, state))
            .correlation_id(session_id)
            .field("state", state)
            .log()
            .await;
    }

    pub async fn log_stop_requested(&self, session_id: &str, known: bool) {
        let level = if known { LogLevel::Info } else { LogLevel::Warn };
        let message = if known {
            format!("Stop requested for session {}", session_id)
        } else {
            format!("Stop requested for unknown session {}", session_id)
        };

        self.logger
            .log(level, &message)
            .correlation_id(session_id)
            .field("known", known)
            .log()
            .await;
    }
}

/// Error event logger with enhanced context
#[derive(Clone)]
pub struct ErrorEventLogger {
    logger: Logger,
}

impl ErrorEventLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("ERR", config),
        }
    }

    /// Log an application error with full context
    pub async fn log_error(&self, error: &AppError, context: Option<&str>, correlation_id: Option<&str>) {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, error),
            None => error.to_string(),
        };

        let mut builder = self.logger.error(&message).error_info(error);

        if let Some(id) = correlation_id {
            builder = builder.correlation_id(id);
        }

        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }

        builder.log().await;
    }
}

/// Creates loggers that share a run id
pub struct LoggerFactory {
    config: Config,
    run_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name, &self.config);
        logger.set_run_id(self.run_id.clone()).await;
        logger.add_context_field("version".to_string(), crate::VERSION).await;
        logger
    }

    pub async fn create_session_logger(&self) -> SessionLogger {
        SessionLogger::from_logger(self.create_logger("SESSION").await)
    }

    pub async fn create_error_logger(&self) -> ErrorEventLogger {
        ErrorEventLogger {
            logger: self.create_logger("ERR").await,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

/// Convenience macros for logging with location information
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $logger.error(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_logger_with_config() {
        let config = Config {
            debug: true,
            enable_color: false,
            ..Default::default()
        };

        let logger = Logger::with_config("TEST", &config);
        assert_eq!(logger.min_level, LogLevel::Debug);
        assert_eq!(logger.format, LogFormat::Json);
        assert!(!logger.use_color);
        assert!(logger.include_location);

        let quiet = Logger::with_config("TEST", &Config::default());
        assert!(!quiet.would_log(LogLevel::Info));
        assert!(quiet.would_log(LogLevel::Warn));
    }

    #[tokio::test]
    async fn test_run_id_in_context() {
        let factory = LoggerFactory::new(Config::default());
        let logger = factory.create_logger("TEST").await;

        let context = logger.context.read().await;
        assert_eq!(context.run_id.as_deref(), Some(factory.run_id()));
        assert_eq!(
            context.context_fields.get("version"),
            Some(&serde_json::Value::String(crate::VERSION.to_string()))
        );
    }

    #[tokio::test]
    async fn test_factory_fields_rendered_in_json() {
        let config = Config {
            debug: true,
            ..Default::default()
        };
        let factory = LoggerFactory::new(config);
        let logger = factory.create_logger("TEST").await;

        let mut entry = logger.info("Listing servers").build();
        logger.attach_context(&mut entry).await;
        let json: serde_json::Value = serde_json::from_str(&logger.render(&entry)).unwrap();
        assert_eq!(json["fields"]["version"], crate::VERSION);
        assert_eq!(json["fields"]["run_id"], factory.run_id());
    }

    #[tokio::test]
    async fn test_logging_macros() {
        let mut logger = Logger::new("MACRO");
        logger.set_level(LogLevel::Trace);
        logger.set_color(false);

        log_debug!(logger, "debug {}", 1);
        log_info!(logger, "info {}", 2);
        log_warn!(logger, "warn {}", 3);
        log_error!(logger, "error {}", 4);
    }

    #[test]
    fn test_console_format_short_correlation_id() {
        let mut logger = Logger::new("TEST");
        logger.set_color(false);
        let entry = logger
            .info("Session started")
            .correlation_id("abc")
            .field("kind", "single")
            .build();

        let output = logger.render(&entry);
        assert!(output.contains(" INFO [TEST] Session started [abc]"));
        assert!(output.contains("kind=\"single\""));
    }

    #[test]
    fn test_json_and_compact_formats() {
        let mut logger = Logger::new("TEST");
        let entry = logger
            .warn("Probe failed")
            .error_info(&AppError::timeout("probe"))
            .build();

        logger.set_format(LogFormat::Json);
        let json: serde_json::Value = serde_json::from_str(&logger.render(&entry)).unwrap();
        assert_eq!(json["level"], "Warn");
        assert_eq!(json["fields"]["error_category"], "TIMEOUT");

        logger.set_format(LogFormat::Compact);
        assert!(logger.render(&entry).contains("W TEST: Probe failed"));
    }

    #[tokio::test]
    async fn test_session_logger_calls() {
        let logger = SessionLogger::new(&Config::default());
        logger.log_session_started("s1", "single").await;
        logger.log_pass_failed("s1", &AppError::network("unreachable")).await;
        logger.log_stop_requested("missing", false).await;
        logger.log_session_finished("s1", "errored").await;
    }
}
