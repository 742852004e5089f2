// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # impulse - Cortical Impulse Scheduler
//!
//! Runs user actions ("synapses") at a configured frequency, one per clock tick,
//! in round-robin order, each on its own worker thread. This crate re-exports the
//! workspace members so applications depend on a single crate.
//!
//! ## Feature Flags
//!
//! - **`config`** (default): load `impulse.toml` through `impulse-config`
//! - **`observability`** (default): logging initialization through `impulse-observability`
//! - **`file-logging`**: rolling JSON log files
//! - **`termination`** (default): SIGINT/SIGTERM handling in `keep_alive`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use impulse::prelude::*;
//!
//! let config = impulse::config::load_config(None, None)?;
//! let (frequency, settings) = impulse::settings::cortex_settings(&config);
//! let cortex = Cortex::with_config(config.cortex.name.as_str(), frequency, settings)?;
//! cortex.spark(vec![Synapse::new(Lifecycle::Looping, "tick", |_| {})])?;
//! keep_alive::keep_alive(config.keep_alive.post_delay())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  impulse-config            impulse-observability        │
//! │  (impulse.toml + env/CLI)  (tracing subscriber, flags)  │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  impulse-cortex                                         │
//! │  (clock, synapse, cortex, cluster, keep-alive)          │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub use impulse_cortex as cortex;

#[cfg(feature = "config")]
pub use impulse_config as config;

#[cfg(feature = "observability")]
pub use impulse_observability as observability;

#[cfg(feature = "config")]
pub mod settings;

/// Prelude - commonly used types
pub mod prelude {
    pub use impulse_cortex::{
        keep_alive, potential, Activation, Bridge, Cluster, ClusterHandle, Control, Cortex,
        CortexConfig, CortexError, CortexHandle, CortexResult, CortexState, FrequencyRef,
        Impulse, Lifecycle, Synapse, SynapseProbe, Timeline, WaitGroup,
    };

    #[cfg(feature = "config")]
    pub use impulse_config::{load_config, ImpulseConfig};
}
