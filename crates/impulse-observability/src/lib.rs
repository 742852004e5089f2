// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # impulse-observability
//!
//! Logging setup shared by the impulse binaries.
//!
//! Library crates only emit `tracing` events; a host calls [`init_logging`] once to
//! install the subscriber. Per-crate debug output is switched on with
//! `--debug-<crate>` arguments or the `IMPULSE_DEBUG` environment variable.
//!
//! ## Features
//! - `file-logging`: daily rolling JSON log files in a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known impulse crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "impulse",
    "impulse-cortex",
    "impulse-config",
    "impulse-observability",
];
