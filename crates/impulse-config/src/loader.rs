// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::types::LogFormat;
use crate::validation::validate_config;
use crate::{ConfigError, ConfigResult, ImpulseConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name searched for when no explicit path is given
pub const CONFIG_FILE_NAME: &str = "impulse.toml";

/// Environment variable pointing at an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "IMPULSE_CONFIG_PATH";

/// Find the impulse configuration file
///
/// Search order:
/// 1. `IMPULSE_CONFIG_PATH` environment variable
/// 2. Current working directory: `./impulse.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        search_paths.extend(
            cwd.ancestors()
                .skip(1)
                .take(5)
                .map(|dir| dir.join(CONFIG_FILE_NAME)),
        );
    }

    if let Some(found) = search_paths.iter().find(|path| path.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Configuration file '{}' not found in any of these locations:\n{}\n\nSet {} environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Returns
///
/// Complete `ImpulseConfig` with all overrides applied
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<ImpulseConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: ImpulseConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    validate_config(&config)?;
    Ok(config)
}

fn env_parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn cli_parsed<T: FromStr>(cli_args: &HashMap<String, String>, key: &str) -> Option<T> {
    cli_args.get(key).and_then(|value| value.trim().parse().ok())
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `IMPULSE_FREQUENCY_HZ` -> `cortex.frequency_hz`
/// - `IMPULSE_CHANNEL_LIMIT` -> `cortex.channel_limit`
/// - `IMPULSE_MAILBOX_CAPACITY` -> `cortex.mailbox_capacity`
/// - `IMPULSE_TIMELINE_CAPACITY` -> `cortex.timeline_capacity`
/// - `IMPULSE_PHASE` -> `cortex.phase`
/// - `IMPULSE_POST_DELAY_MS` -> `keep_alive.post_delay_ms`
/// - `IMPULSE_LOG_LEVEL` -> `logging.level`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut ImpulseConfig) {
    if let Some(hz) = env_parsed::<f64>("IMPULSE_FREQUENCY_HZ") {
        config.cortex.frequency_hz = hz;
    }
    if let Some(limit) = env_parsed::<usize>("IMPULSE_CHANNEL_LIMIT") {
        config.cortex.channel_limit = limit;
    }
    if let Some(capacity) = env_parsed::<usize>("IMPULSE_MAILBOX_CAPACITY") {
        config.cortex.mailbox_capacity = capacity;
    }
    if let Some(capacity) = env_parsed::<usize>("IMPULSE_TIMELINE_CAPACITY") {
        config.cortex.timeline_capacity = capacity;
    }
    if let Some(phase) = env_parsed::<u64>("IMPULSE_PHASE") {
        config.cortex.phase = Some(phase);
    }
    if let Some(delay) = env_parsed::<u64>("IMPULSE_POST_DELAY_MS") {
        config.keep_alive.post_delay_ms = delay;
    }
    if let Ok(value) = env::var("IMPULSE_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"frequency_hz": "30", "phase": "3"}`)
pub fn apply_cli_overrides(config: &mut ImpulseConfig, cli_args: &HashMap<String, String>) {
    // Cortex settings
    if let Some(value) = cli_args.get("name") {
        config.cortex.name = value.clone();
    }
    if let Some(hz) = cli_parsed::<f64>(cli_args, "frequency_hz") {
        config.cortex.frequency_hz = hz;
    }
    if let Some(limit) = cli_parsed::<usize>(cli_args, "channel_limit") {
        config.cortex.channel_limit = limit;
    }
    if let Some(capacity) = cli_parsed::<usize>(cli_args, "mailbox_capacity") {
        config.cortex.mailbox_capacity = capacity;
    }
    if let Some(capacity) = cli_parsed::<usize>(cli_args, "timeline_capacity") {
        config.cortex.timeline_capacity = capacity;
    }
    if let Some(phase) = cli_parsed::<u64>(cli_args, "phase") {
        config.cortex.phase = Some(phase);
    }

    if let Some(hz) = cli_parsed::<f64>(cli_args, "sub_frequency_hz") {
        config.cluster.sub_frequency_hz = hz;
    }
    if let Some(delay) = cli_parsed::<u64>(cli_args, "post_delay_ms") {
        config.keep_alive.post_delay_ms = delay;
    }

    // Logging settings
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(format) = cli_args.get("log_format").and_then(|v| LogFormat::parse(v)) {
        config.logging.format = format;
    }
    if let Some(value) = cli_args.get("log_dir") {
        config.logging.log_dir = Some(PathBuf::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const OVERRIDE_VARS: [&str; 7] = [
        "IMPULSE_FREQUENCY_HZ",
        "IMPULSE_CHANNEL_LIMIT",
        "IMPULSE_MAILBOX_CAPACITY",
        "IMPULSE_TIMELINE_CAPACITY",
        "IMPULSE_PHASE",
        "IMPULSE_POST_DELAY_MS",
        "IMPULSE_LOG_LEVEL",
    ];

    fn clear_overrides() {
        for key in OVERRIDE_VARS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        File::create(&config_path).unwrap();

        env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("absent.toml");

        env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        match result {
            Err(ConfigError::FileNotFound(msg)) => assert!(msg.contains(CONFIG_PATH_ENV)),
            other => panic!("expected FileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_overrides();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[cortex]").unwrap();
        writeln!(file, "frequency_hz = 30.0").unwrap();
        writeln!(file, "phase = 3").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.cortex.frequency_hz, 30.0);
        assert_eq!(config.cortex.phase, Some(3));
        assert_eq!(config.cortex.mailbox_capacity, 8);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_overrides();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[cortex]").unwrap();
        writeln!(file, "phase = 0").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = ImpulseConfig::default();

        env::set_var("IMPULSE_FREQUENCY_HZ", "250");
        env::set_var("IMPULSE_PHASE", "4");
        env::set_var("IMPULSE_MAILBOX_CAPACITY", "not-a-number");

        apply_environment_overrides(&mut config);
        clear_overrides();

        assert_eq!(config.cortex.frequency_hz, 250.0);
        assert_eq!(config.cortex.phase, Some(4));
        assert_eq!(config.cortex.mailbox_capacity, 8);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = ImpulseConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("name".to_string(), "motor".to_string());
        cli_args.insert("sub_frequency_hz".to_string(), "5".to_string());
        cli_args.insert("log_format".to_string(), "json".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.cortex.name, "motor");
        assert_eq!(config.cluster.sub_frequency_hz, 5.0);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_overrides();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[cortex]").unwrap();
        writeln!(file, "frequency_hz = 10.0").unwrap();
        writeln!(file, "timeline_capacity = 32").unwrap();
        writeln!(file, "[logging]").unwrap();
        writeln!(file, "level = \"warn\"").unwrap();

        env::set_var("IMPULSE_FREQUENCY_HZ", "20");
        env::set_var("IMPULSE_TIMELINE_CAPACITY", "64");

        let mut cli_args = HashMap::new();
        cli_args.insert("frequency_hz".to_string(), "40".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();
        clear_overrides();

        // CLI wins for frequency, env wins for timeline (no CLI override), file keeps level
        assert_eq!(config.cortex.frequency_hz, 40.0);
        assert_eq!(config.cortex.timeline_capacity, 64);
        assert_eq!(config.logging.level, "warn");
    }
}
