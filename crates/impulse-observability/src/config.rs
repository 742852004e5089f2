// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Observability configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Run folders kept under `log_dir` when none is configured
pub const DEFAULT_RETENTION_RUNS: usize = 10;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Console format
    pub format: LogFormat,

    /// Base directory for rolling log files (requires `file-logging`)
    pub log_dir: Option<PathBuf>,

    /// Number of most recent run folders to keep
    pub retention_runs: usize,
}

/// Log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LoggingConfig {
    /// Level as an `EnvFilter` directive. `WARNING` style names are accepted.
    pub fn filter_level(&self) -> String {
        match self.level.trim().to_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "" => "info".to_string(),
            other => other.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Text,
            log_dir: None,
            retention_runs: DEFAULT_RETENTION_RUNS,
        }
    }
}
