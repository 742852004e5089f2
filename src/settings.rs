// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Conversion from file configuration into runtime values.

use impulse_config::ImpulseConfig;
use impulse_cortex::{CortexConfig, FrequencyRef};

/// Frequency handle and cortex settings for `config.cortex`
pub fn cortex_settings(config: &ImpulseConfig) -> (FrequencyRef, CortexConfig) {
    let section = &config.cortex;
    (
        FrequencyRef::new(section.frequency_hz),
        CortexConfig {
            channel_limit: section.channel_limit,
            mailbox_capacity: section.mailbox_capacity,
            timeline_capacity: section.timeline_capacity,
            phase: section.phase,
        },
    )
}

/// Sub-frequency handle for clusters
pub fn cluster_frequency(config: &ImpulseConfig) -> FrequencyRef {
    FrequencyRef::new(config.cluster.sub_frequency_hz)
}

/// Logging settings for `impulse-observability`
#[cfg(feature = "observability")]
pub fn logging_config(config: &ImpulseConfig) -> impulse_observability::LoggingConfig {
    use impulse_observability::LogFormat;

    impulse_observability::LoggingConfig {
        level: config.logging.level.clone(),
        format: match config.logging.format {
            impulse_config::LogFormat::Text => LogFormat::Text,
            impulse_config::LogFormat::Json => LogFormat::Json,
        },
        log_dir: config.logging.log_dir.clone(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cortex_settings_copy_every_field() {
        let mut config = ImpulseConfig::default();
        config.cortex.frequency_hz = 30.0;
        config.cortex.channel_limit = 64;
        config.cortex.mailbox_capacity = 2;
        config.cortex.timeline_capacity = 40;
        config.cortex.phase = Some(3);

        let (frequency, settings) = cortex_settings(&config);

        assert_eq!(frequency.get(), 30.0);
        assert_eq!(settings.channel_limit, 64);
        assert_eq!(settings.mailbox_capacity, 2);
        assert_eq!(settings.timeline_capacity, 40);
        assert_eq!(settings.phase, Some(3));
    }

    #[test]
    fn test_defaults_line_up() {
        let (_, settings) = cortex_settings(&ImpulseConfig::default());
        let defaults = CortexConfig::default();
        assert_eq!(settings.channel_limit, defaults.channel_limit);
        assert_eq!(settings.mailbox_capacity, defaults.mailbox_capacity);
        assert_eq!(settings.timeline_capacity, defaults.timeline_capacity);
        assert_eq!(settings.phase, defaults.phase);
    }

    #[cfg(feature = "observability")]
    #[test]
    fn test_logging_config_maps_format() {
        let mut config = ImpulseConfig::default();
        config.logging.format = impulse_config::LogFormat::Json;
        config.logging.level = "debug".to_string();

        let logging = logging_config(&config);
        assert_eq!(logging.format, impulse_observability::LogFormat::Json);
        assert_eq!(logging.level, "debug");
        assert!(logging.log_dir.is_none());
    }
}
