use log::{debug, error, info, trace, warn};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use crate::config::LoggingConfig;
use crate::error::{ErrorSeverity, WatchError};

/// Structured logging context: component, operation and key=value metadata
/// appended to the message.
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub metadata: BTreeMap<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_block_number(self, block_number: u64) -> Self {
        self.with_metadata("block_number", json!(block_number))
    }

    pub fn with_transaction_hash(self, tx_hash: &str) -> Self {
        self.with_metadata("transaction_hash", json!(tx_hash))
    }

    pub fn with_amount(self, amount: &str) -> Self {
        self.with_metadata("amount", json!(amount))
    }

    pub fn with_duration_ms(self, duration_ms: u64) -> Self {
        self.with_metadata("duration_ms", json!(duration_ms))
    }

    pub fn with_retry_count(self, retry_count: u32) -> Self {
        self.with_metadata("retry_count", json!(retry_count))
    }

    fn format_message(&self, message: &str) -> String {
        let mut line = format!("{}::{} {}", self.component, self.operation, message);
        for (key, value) in &self.metadata {
            match value {
                Value::String(s) => line.push_str(&format!(" {}={}", key, s)),
                other => line.push_str(&format!(" {}={}", key, other)),
            }
        }
        line
    }

    pub fn info(&self, message: &str) {
        info!("{}", self.format_message(message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.format_message(message));
    }

    pub fn error(&self, message: &str) {
        error!("{}", self.format_message(message));
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", self.format_message(message));
    }

    pub fn trace(&self, message: &str) {
        trace!("{}", self.format_message(message));
    }
}

/// Times a single operation
pub struct PerformanceMonitor {
    start_time: Instant,
    operation: String,
}

impl PerformanceMonitor {
    pub fn new(operation: &str) -> Self {
        Self {
            start_time: Instant::now(),
            operation: operation.to_string(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) -> u64
    where
        E: Display,
    {
        let duration = self.elapsed_ms();
        let context = LogContext::new("performance", &self.operation).with_duration_ms(duration);

        match result {
            Ok(_) => context.trace(&format!("Completed in {}ms", duration)),
            Err(e) => context.debug(&format!("Failed after {}ms: {}", duration, e)),
        }

        duration
    }
}

/// Error logging utilities
pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_error(error: &WatchError, context: Option<LogContext>) {
        let severity = error.severity();

        let log_context = context
            .unwrap_or_else(|| LogContext::new("error", "unknown"))
            .with_metadata("severity", json!(format!("{:?}", severity)))
            .with_metadata("recoverable", json!(error.is_recoverable()));

        let message = format!("Error occurred: {}", error);

        match severity {
            ErrorSeverity::Critical | ErrorSeverity::High => log_context.error(&message),
            ErrorSeverity::Medium => log_context.warn(&message),
            ErrorSeverity::Low => log_context.info(&message),
        }
    }

    pub fn log_retry_attempt(operation: &str, error: &impl Display, attempt: u32) {
        LogContext::new("recovery", "retry_attempt")
            .with_metadata("operation", json!(operation))
            .with_retry_count(attempt)
            .warn(&format!("Attempt {} failed: {}", attempt, error));
    }

    pub fn log_recovery_success(operation: &str, attempts: u32) {
        LogContext::new("recovery", "success")
            .with_metadata("operation", json!(operation))
            .with_retry_count(attempts)
            .info(&format!("Operation recovered after {} attempts", attempts));
    }
}

/// Operational metrics written to the log
pub struct MetricsLogger;

impl MetricsLogger {
    pub fn log_rpc_call(method: &str, duration_ms: u64, success: bool) {
        let context = LogContext::new("metrics", "rpc_call")
            .with_metadata("method", json!(method))
            .with_duration_ms(duration_ms)
            .with_metadata("success", json!(success));

        if success {
            context.trace(&format!("RPC call {} completed in {}ms", method, duration_ms));
        } else {
            context.warn(&format!("RPC call {} failed after {}ms", method, duration_ms));
        }
    }

    pub fn log_cycle(from_block: u64, to_block: u64, matched: usize, notified: usize, duration_ms: u64) {
        let context = LogContext::new("metrics", "poll_cycle")
            .with_metadata("from_block", json!(from_block))
            .with_metadata("to_block", json!(to_block))
            .with_metadata("matched", json!(matched))
            .with_metadata("notified", json!(notified))
            .with_duration_ms(duration_ms);

        if matched > 0 {
            context.info(&format!("Scanned blocks {}..={}", from_block, to_block));
        } else {
            context.debug(&format!("Scanned blocks {}..={}", from_block, to_block));
        }
    }
}

/// Writes every log line to stdout and, when configured, an append-only file
struct TeeWriter {
    stdout: io::Stdout,
    file: Option<File>,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdout.write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// `[ISO-8601 timestamp] [LEVEL] message`
pub fn format_line(timestamp: chrono::DateTime<chrono::Utc>, level: log::Level, message: &dyn Display) -> String {
    format!(
        "[{}] [{}] {}",
        timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        level,
        message
    )
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize logging for the application. `RUST_LOG` overrides the
/// configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let file = if config.file_enabled {
        Some(open_log_file(Path::new(&config.file_path))?)
    } else {
        None
    };

    let writer = TeeWriter {
        stdout: io::stdout(),
        file,
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.level.as_str()))
        .format(|buf, record| {
            writeln!(buf, "{}", format_line(chrono::Utc::now(), record.level(), record.args()))
        })
        .target(env_logger::Target::Pipe(Box::new(writer)))
        .try_init()?;

    info!("Logging initialized");
    Ok(())
}
