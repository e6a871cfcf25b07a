// SPDX-FileCopyrightText: 2026 Sqlthread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty names, port ranges and known log levels.

use crate::diagnostic::ConfigError;
use crate::model::SqlthreadConfig;

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SqlthreadConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.connection.driver.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "connection.driver must not be empty".to_string(),
        });
    }

    if config.connection.database.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "connection.database must not be empty".to_string(),
        });
    }

    if config.connection.port == Some(0) {
        errors.push(ConfigError::Validation {
            message: "connection.port must be between 1 and 65535, got 0".to_string(),
        });
    }

    if let Some(query) = &config.query.initial_query
        && query.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "query.initial_query must not be blank when set".to_string(),
        });
    }

    for (key, name) in [
        ("worker.thread_name", &config.worker.thread_name),
        ("worker.relay_thread_name", &config.worker.relay_thread_name),
    ] {
        if name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        }
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&SqlthreadConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = SqlthreadConfig::default();
        config.connection.driver = " ".into();
        config.connection.database = String::new();
        config.connection.port = Some(0);
        config.worker.relay_thread_name = String::new();
        config.logging.level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = SqlthreadConfig::default();
        config.logging.level = "DEBUG".into();
        assert!(validate_config(&config).is_ok());
    }
}
