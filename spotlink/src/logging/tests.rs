use crate::config::{LogFormat, LogLevel, LoggingConfig};
use crate::logging::{LogError, level_to_log_level, log_level_to_level, parse_log_level};
use tempfile::tempdir;

#[test]
fn test_init_is_idempotent() {
    let config = LoggingConfig {
        level: LogLevel::Debug,
        format: LogFormat::Compact,
        file: None,
        stdout: true,
    };

    let _first = crate::logging::init(&config).unwrap();
    // A second initialization keeps the installed subscriber.
    let _second = crate::logging::init(&config).unwrap();
}

#[test]
fn test_init_creates_log_directory() {
    let temp_dir = tempdir().unwrap();
    let log_path = temp_dir.path().join("nested").join("spotlink.log");

    let config = LoggingConfig {
        level: LogLevel::Info,
        format: LogFormat::Json,
        file: Some(log_path.clone()),
        stdout: false,
    };

    let _guard = crate::logging::init(&config).unwrap();
    assert!(log_path.parent().unwrap().exists());
}

#[test]
fn test_level_conversion() {
    assert_eq!(parse_log_level("trace").unwrap(), LogLevel::Trace);
    assert_eq!(parse_log_level("DEBUG").unwrap(), LogLevel::Debug);
    assert_eq!(parse_log_level("info").unwrap(), LogLevel::Info);
    assert_eq!(parse_log_level("warn").unwrap(), LogLevel::Warn);
    assert_eq!(parse_log_level("error").unwrap(), LogLevel::Error);
    assert!(matches!(
        parse_log_level("invalid"),
        Err(LogError::InvalidLogLevel(_))
    ));

    assert_eq!(level_to_log_level(tracing::Level::TRACE), LogLevel::Trace);
    assert_eq!(level_to_log_level(tracing::Level::DEBUG), LogLevel::Debug);
    assert_eq!(level_to_log_level(tracing::Level::INFO), LogLevel::Info);
    assert_eq!(level_to_log_level(tracing::Level::WARN), LogLevel::Warn);
    assert_eq!(level_to_log_level(tracing::Level::ERROR), LogLevel::Error);

    for level in [LogLevel::Trace, LogLevel::Info, LogLevel::Error] {
        assert_eq!(level_to_log_level(log_level_to_level(level)), level);
    }
}
