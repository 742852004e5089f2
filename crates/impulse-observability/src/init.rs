// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization
//!
//! Console output is always installed. With the `file-logging` feature and a
//! configured `log_dir`, a JSON copy of every event goes to a daily rolling
//! file inside a timestamped run folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── impulse.log.2025-01-01
//! ```

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

/// Keeps file writers alive; logs are flushed when it drops.
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    run_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving log files, if file logging is active
    pub fn run_dir(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }
}

/// Build the filter: `RUST_LOG` when set, otherwise configured level plus debug flags
pub fn build_filter(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = debug_flags.to_filter_string(&config.filter_level());
    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter: {}", directives))
}

/// Initialize logging for the process
///
/// # Errors
///
/// Fails if the filter is malformed, the run folder cannot be created, or a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    let filter = build_filter(config, debug_flags)?;

    let text_layer = (config.format == LogFormat::Text).then(|| fmt::layer().with_target(true));
    let json_layer =
        (config.format == LogFormat::Json).then(|| fmt::layer().json().with_target(true));

    #[cfg(feature = "file-logging")]
    let (file_layer, file_guard, run_dir) = match &config.log_dir {
        Some(base) => {
            let run_folder = create_run_folder(base)?;
            prune_runs(base, config.retention_runs)?;
            let appender = tracing_appender::rolling::daily(&run_folder, "impulse.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json();
            (Some(layer), Some(guard), Some(run_folder))
        }
        None => (None, None, None),
    };
    #[cfg(not(feature = "file-logging"))]
    let (file_layer, run_dir) = (None::<tracing_subscriber::layer::Identity>, None::<PathBuf>);

    Registry::default()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install global tracing subscriber")?;

    match &run_dir {
        Some(dir) => info!("[OBSERVABILITY] ✅ Logging to {}", dir.display()),
        None if config.log_dir.is_some() => {
            tracing::warn!("[OBSERVABILITY] ⚠️ log_dir ignored: built without file-logging")
        }
        None => {}
    }

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guard: file_guard,
        run_dir,
    })
}

/// Initialize console logging with default settings
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(&LoggingConfig::default(), debug_flags)
}

/// Create `run_<timestamp>` under `base`
pub fn create_run_folder(base: &Path) -> Result<PathBuf> {
    let run_folder = base.join(format!(
        "{}{}",
        RUN_PREFIX,
        Utc::now().format(RUN_TIMESTAMP)
    ));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    Ok(run_folder)
}

/// Remove all but the `keep` most recent run folders under `base`
///
/// Returns the number of folders removed. Entries whose name is not a run
/// timestamp are left alone.
pub fn prune_runs(base: &Path, keep: usize) -> Result<usize> {
    if !base.exists() {
        return Ok(0);
    }

    let mut runs = Vec::new();
    for entry in std::fs::read_dir(base)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|s| NaiveDateTime::parse_from_str(s, RUN_TIMESTAMP).ok());
        if let Some(naive) = stamp {
            runs.push((path, Utc.from_utc_datetime(&naive)));
        }
    }

    // Newest first
    runs.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in runs.iter().skip(keep) {
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }
    Ok(removed)
}
