//! Configuration validation utilities.

use super::ConfigError;
use super::models::*;

/// Validate the entire configuration.
pub fn validate_config(config: &SpotlinkConfig) -> Result<(), ConfigError> {
    validate_spotting_config(&config.spotting)?;
    validate_disambiguation_config(&config.disambiguation)?;
    validate_oracle_config(&config.oracle)?;
    validate_pipeline_config(&config.pipeline)?;

    Ok(())
}

fn validate_spotting_config(config: &SpottingConfig) -> Result<(), ConfigError> {
    if config.min_mention_chars == 0 {
        return Err(ConfigError::ValidationError(
            "Minimum mention length must be at least 1 character".to_string(),
        ));
    }

    Ok(())
}

fn validate_disambiguation_config(config: &DisambiguationConfig) -> Result<(), ConfigError> {
    if config.producer_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Producer id cannot be empty".to_string(),
        ));
    }

    if config.max_candidates == 0 {
        return Err(ConfigError::ValidationError(
            "Maximum candidates must be at least 1".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.min_score) {
        return Err(ConfigError::ValidationError(format!(
            "Minimum score must be within [0, 1], got {}",
            config.min_score
        )));
    }

    if config.max_concurrent_mentions == 0 {
        return Err(ConfigError::ValidationError(
            "Mention concurrency must be at least 1".to_string(),
        ));
    }

    if config.oracle_deadline.is_zero() {
        return Err(ConfigError::ValidationError(
            "Oracle deadline must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_oracle_config(config: &OracleConfig) -> Result<(), ConfigError> {
    match config.kind {
        OracleKind::Local => {
            if !(0.0..=1.0).contains(&config.type_mismatch_penalty) {
                return Err(ConfigError::ValidationError(format!(
                    "Type mismatch penalty must be within [0, 1], got {}",
                    config.type_mismatch_penalty
                )));
            }
        }
        OracleKind::Remote => {
            let endpoint = config.endpoint.as_deref().unwrap_or_default();
            if endpoint.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "Remote oracle requires an endpoint".to_string(),
                ));
            }
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "Remote oracle endpoint must be an http(s) URL, got {}",
                    endpoint
                )));
            }
        }
    }

    Ok(())
}

fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.supported_languages.is_empty() {
        return Err(ConfigError::ValidationError(
            "At least one supported language is required".to_string(),
        ));
    }

    if config.max_concurrent_documents == 0 {
        return Err(ConfigError::ValidationError(
            "Document concurrency must be at least 1".to_string(),
        ));
    }

    if config.retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(format!(
            "Backoff multiplier must be at least 1.0, got {}",
            config.retry.backoff_multiplier
        )));
    }

    Ok(())
}
