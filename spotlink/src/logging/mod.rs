//! Structured logging infrastructure for Spotlink.
//!
//! This module provides a configurable logging system based on the tracing crate,
//! supporting different output formats, log levels and an optional log file.
//! `RUST_LOG` directives take precedence over the configured level.

#[cfg(test)]
mod tests;

use crate::config::{LogFormat, LogLevel, LoggingConfig};
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

/// Error type for logging operations
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing log level
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    /// Error in filter setup
    #[error("Invalid log filter: {0}")]
    FilterError(String),
}

/// Result type for logging operations
pub type Result<T> = std::result::Result<T, LogError>;

/// Keeps the background log file writer alive.
///
/// Buffered file output is flushed when the guard is dropped, so hold it for
/// the lifetime of the application.
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize the logging system with the given configuration.
///
/// If a global subscriber is already installed (e.g. by an embedding
/// application or another test) the existing one is kept and this is a no-op.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = log_level_to_level(config.level);
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env()
        .map_err(|e| LogError::FilterError(e.to_string()))?;

    let (writer, guard) = make_writer(config)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_level(true)
        .with_target(true)
        .with_line_number(true)
        .with_thread_ids(true);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Default => builder.try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("Keeping existing global subscriber: {}", e);
        return Ok(LoggingGuard::default());
    }

    Ok(LoggingGuard { _file: guard })
}

fn make_writer(config: &LoggingConfig) -> Result<(BoxMakeWriter, Option<WorkerGuard>)> {
    match (&config.file, config.stdout) {
        (Some(path), true) => {
            let (file, guard) = create_non_blocking_file(path)?;
            Ok((BoxMakeWriter::new(std::io::stdout.and(file)), Some(guard)))
        }
        (Some(path), false) => {
            let (file, guard) = create_non_blocking_file(path)?;
            Ok((BoxMakeWriter::new(file), Some(guard)))
        }
        (None, true) => Ok((BoxMakeWriter::new(std::io::stdout), None)),
        (None, false) => Ok((BoxMakeWriter::new(std::io::sink), None)),
    }
}

/// Create a non-blocking file writer.
fn create_non_blocking_file(path: impl AsRef<Path>) -> Result<(NonBlocking, WorkerGuard)> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = path.file_name().ok_or_else(|| {
        LogError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("log file path has no file name: {}", path.display()),
        ))
    })?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .map_err(|e| LogError::IoError(std::io::Error::other(e.to_string())))?;
    Ok(tracing_appender::non_blocking(file_appender))
}

/// Parse a log level string into a LogLevel enum.
pub fn parse_log_level(level: &str) -> Result<LogLevel> {
    level
        .parse::<LogLevel>()
        .map_err(|_| LogError::InvalidLogLevel(level.to_string()))
}

/// Convert a tracing::Level to a LogLevel enum.
pub fn level_to_log_level(level: Level) -> LogLevel {
    match level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

/// Convert a LogLevel to a tracing::Level.
pub fn log_level_to_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}
