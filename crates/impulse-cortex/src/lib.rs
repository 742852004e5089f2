// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # impulse-cortex
//!
//! Frequency-driven impulse scheduler.
//!
//! A [`Cortex`] owns a clock and a ring of [`Synapse`]s. Each time the clock fires, the next
//! synapse in the ring receives an [`Impulse`]; it decides through its potential whether to
//! activate, runs its action on its own worker thread, and records an [`Activation`] in its
//! [`Timeline`]. Lifecycles decide what happens afterwards:
//!
//! | Lifecycle      | After an activation                                   |
//! |----------------|-------------------------------------------------------|
//! | `Looping`      | stays until the action calls [`Impulse::decay`]       |
//! | `Stimulative`  | stays; activations run concurrently on fresh threads  |
//! | `Triggered`    | removed after the first successful activation         |
//! | `Impulse`      | removed after one attempt, passed or not              |
//!
//! A [`Cluster`] is itself a looping synapse that relays impulses to nested neurons at a
//! sub-frequency. [`keep_alive`] ties every cortex of the process to SIGINT/SIGTERM.
//!
//! ```no_run
//! use impulse_cortex::{Cortex, Lifecycle, Synapse};
//!
//! let mut cortex = Cortex::new("main", 100.0)?;
//! let synapse = Synapse::new(Lifecycle::Looping, "tick", |impulse| {
//!     if impulse.step() >= 1_000 {
//!         impulse.decay();
//!     }
//! });
//! let probe = synapse.probe();
//! cortex.spark(vec![synapse])?;
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! println!("{} activations", probe.recorded());
//! cortex.decay()?;
//! # Ok::<(), impulse_cortex::CortexError>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod activation;
pub mod clock;
pub mod cluster;
pub mod control;
pub mod cortex;
pub mod diagnostic;
pub mod error;
pub mod frequency;
pub mod keep_alive;
pub mod potential;
pub mod synapse;
pub mod timeline;

pub use activation::{Activation, Bridge, Counters, Impulse};
pub use clock::{Clock, ClockDecision, MAX_WAIT};
pub use cluster::{Cluster, ClusterHandle};
pub use control::{Control, CortexHandle, Deferral};
pub use cortex::{
    Cortex, CortexConfig, CortexState, CortexStats, DEFAULT_CHANNEL_LIMIT,
    DEFAULT_MAILBOX_CAPACITY,
};
pub use error::{CortexError, CortexResult};
pub use frequency::FrequencyRef;
pub use synapse::{Lifecycle, Synapse, SynapseProbe};
pub use timeline::{Timeline, TimelineMetrics, DEFAULT_TIMELINE_CAPACITY, MIN_TIMELINE_CAPACITY};

/// Wait group handed to deferrals.
pub use crossbeam::sync::WaitGroup;
