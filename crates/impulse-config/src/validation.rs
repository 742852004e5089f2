// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every check runs and the failures are reported together, so a broken file
//! can be fixed in one pass.

use crate::{ConfigError, ConfigResult, ImpulseConfig};
use std::fmt;

/// Log levels accepted by `logging.level`
pub const KNOWN_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "warning", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Required fields
/// - Frequencies that are finite and non-negative
/// - Capacities and phase within range
/// - A known log level
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_config(config: &ImpulseConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Run every check and return all failures
pub fn collect_errors(config: &ImpulseConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_required_fields(config, &mut errors);
    validate_frequencies(config, &mut errors);
    validate_capacities(config, &mut errors);
    validate_logging(config, &mut errors);
    errors
}

fn invalid(field: &str, reason: &str) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_required_fields(config: &ImpulseConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.cortex.name.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "cortex.name".to_string(),
        });
    }
}

fn validate_frequencies(config: &ImpulseConfig, errors: &mut Vec<ConfigValidationError>) {
    let frequencies = [
        ("cortex.frequency_hz", config.cortex.frequency_hz),
        ("cluster.sub_frequency_hz", config.cluster.sub_frequency_hz),
    ];
    for (field, hz) in frequencies {
        if !hz.is_finite() || hz < 0.0 {
            errors.push(invalid(field, "must be a finite, non-negative number"));
        }
    }
}

fn validate_capacities(config: &ImpulseConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.cortex.channel_limit == 0 {
        errors.push(invalid("cortex.channel_limit", "must be at least 1"));
    }
    if config.cortex.mailbox_capacity == 0 {
        errors.push(invalid("cortex.mailbox_capacity", "must be at least 1"));
    }
    if config.cortex.timeline_capacity < 2 {
        errors.push(invalid("cortex.timeline_capacity", "must be at least 2"));
    }
    if config.cortex.phase == Some(0) {
        errors.push(invalid("cortex.phase", "must be at least 1 when set"));
    }
}

fn validate_logging(config: &ImpulseConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.trim().to_lowercase();
    if !KNOWN_LOG_LEVELS.contains(&level.as_str()) {
        errors.push(invalid(
            "logging.level",
            "must be one of trace, debug, info, warn, error",
        ));
    }
}
