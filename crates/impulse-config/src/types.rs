// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `impulse.toml`. Every section is optional in the file; missing keys take
//! the defaults below.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ImpulseConfig {
    pub cortex: CortexConfig,
    pub cluster: ClusterConfig,
    pub keep_alive: KeepAliveConfig,
    pub logging: LoggingConfig,
}

/// Cortex scheduling configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CortexConfig {
    pub name: String,
    /// Desired impulses per second. 0 stops the clock.
    pub frequency_hz: f64,
    /// Bound of the control message channel
    pub channel_limit: usize,
    /// Per-synapse mailbox slots
    pub mailbox_capacity: usize,
    pub timeline_capacity: usize,
    /// Fixed beat ring size. Absent means "number of registered synapses".
    pub phase: Option<u64>,
}

impl Default for CortexConfig {
    fn default() -> Self {
        Self {
            name: "main".to_string(),
            frequency_hz: 100.0,
            channel_limit: 1024,
            mailbox_capacity: 8,
            timeline_capacity: 16,
            phase: None,
        }
    }
}

/// Cluster relay configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Rate at which a cluster relays impulses to its neurons. 0 relays every impulse.
    pub sub_frequency_hz: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            sub_frequency_hz: 10.0,
        }
    }
}

/// Process termination configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// Pause between the termination signal and the start of deferrals
    pub post_delay_ms: u64,
}

impl KeepAliveConfig {
    pub fn post_delay(&self) -> Option<Duration> {
        (self.post_delay_ms > 0).then(|| Duration::from_millis(self.post_delay_ms))
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Directory for rolling log files. Console only when absent.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: ImpulseConfig = toml::from_str("").unwrap();
        assert_eq!(config, ImpulseConfig::default());
        assert_eq!(config.cortex.frequency_hz, 100.0);
        assert_eq!(config.cortex.phase, None);
        assert_eq!(config.keep_alive.post_delay(), None);
    }

    #[test]
    fn test_partial_sections() {
        let config: ImpulseConfig = toml::from_str(
            r#"
            [cortex]
            name = "vision"
            phase = 3

            [keep_alive]
            post_delay_ms = 250

            [logging]
            format = "json"
            log_dir = "/tmp/impulse"
            "#,
        )
        .unwrap();

        assert_eq!(config.cortex.name, "vision");
        assert_eq!(config.cortex.phase, Some(3));
        assert_eq!(config.cortex.channel_limit, 1024);
        assert_eq!(
            config.keep_alive.post_delay(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.log_dir, Some(PathBuf::from("/tmp/impulse")));
        assert_eq!(config.cluster.sub_frequency_hz, 10.0);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse(" JSON "), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("text"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("xml"), None);
        assert_eq!(LogFormat::Json.to_string(), "json");
    }
}
