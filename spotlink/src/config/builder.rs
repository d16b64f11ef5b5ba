//! Configuration builder.
//!
//! This module provides a builder pattern API for creating configurations.

use super::{Result, models::*, validation};
use std::path::Path;
use std::time::Duration;

/// Builder for creating SpotlinkConfig instances.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: SpotlinkConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self {
            config: SpotlinkConfig::default(),
        }
    }

    /// Load the gazetteer from a sealed artifact at startup.
    pub fn with_gazetteer_artifact<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.gazetteer.artifact = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the gazetteer matching behaviour.
    pub fn with_match_config(mut self, matching: MatchConfig) -> Self {
        self.config.gazetteer.matching = matching;
        self
    }

    /// Set the spotting configuration.
    pub fn with_spotting_config(mut self, spotting: SpottingConfig) -> Self {
        self.config.spotting = spotting;
        self
    }

    /// Set the context window attached to mentions.
    pub fn with_context_window(mut self, context: ContextWindow) -> Self {
        self.config.spotting.context = context;
        self
    }

    /// Set the producer id recorded on annotations.
    pub fn with_producer_id(mut self, producer_id: impl Into<String>) -> Self {
        self.config.disambiguation.producer_id = producer_id.into();
        self
    }

    /// Set the number of candidates retained per annotation.
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.config.disambiguation.max_candidates = max_candidates;
        self
    }

    /// Set the deadline for a single oracle call.
    pub fn with_oracle_deadline(mut self, deadline: Duration) -> Self {
        self.config.disambiguation.oracle_deadline = deadline;
        self
    }

    /// Use the in-process oracle.
    pub fn with_local_oracle(mut self) -> Self {
        self.config.oracle.kind = OracleKind::Local;
        self.config.oracle.endpoint = None;
        self
    }

    /// Use a remote disambiguation service.
    pub fn with_remote_oracle(mut self, endpoint: impl Into<String>) -> Self {
        self.config.oracle.kind = OracleKind::Remote;
        self.config.oracle.endpoint = Some(endpoint.into());
        self
    }

    /// Set the languages the pipeline accepts.
    pub fn with_supported_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.pipeline.supported_languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Set concurrency limits for documents and for mentions of one document.
    pub fn with_concurrency(mut self, documents: usize, mentions: usize) -> Self {
        self.config.pipeline.max_concurrent_documents = documents;
        self.config.disambiguation.max_concurrent_mentions = mentions;
        self
    }

    /// Set the retry policy for oracle failures.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.config.pipeline.retry = retry;
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set the log format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Configure logging to a file.
    pub fn with_log_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.logging.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Use default logging configuration (console output at Info level)
    pub fn with_default_logging(mut self) -> Self {
        self.config.logging.level = LogLevel::Info;
        self.config.logging.format = LogFormat::Json;
        self.config.logging.file = None;

        self
    }

    /// Create a configuration for development.
    ///
    /// Local oracle, debug-level logging in pretty format.
    pub fn development() -> Self {
        Self::new()
            .with_local_oracle()
            .with_log_level(LogLevel::Debug)
            .with_log_format(LogFormat::Pretty)
    }

    /// Create a configuration for testing.
    ///
    /// Like development, but without retries and with short deadlines so
    /// failure paths resolve quickly.
    pub fn testing() -> Self {
        Self::development()
            .with_retry_policy(RetryPolicy::none())
            .with_oracle_deadline(Duration::from_secs(2))
    }

    /// Create a production-ready configuration.
    ///
    /// JSON logging at Info level and the default retry policy.
    pub fn production() -> Self {
        Self::new().with_default_logging()
    }

    /// Build the configuration, validating it in the process.
    pub fn build(self) -> Result<SpotlinkConfig> {
        validation::validate_config(&self.config)?;

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
