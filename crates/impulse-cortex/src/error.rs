// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CortexError {
    #[error("cortex '{0}' has terminated")]
    Terminated(String),

    #[error("failed to spawn {role} thread for '{name}': {source}")]
    Spawn {
        role: &'static str,
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("phase must be greater than zero")]
    InvalidPhase,

    #[error("unknown synapse lifecycle '{0}' (expected looping, stimulative, triggered or impulse)")]
    InvalidLifecycle(String),

    #[error("coordinator thread of cortex '{0}' panicked")]
    CoordinatorPanicked(String),

    #[cfg(feature = "termination")]
    #[error("failed to install termination signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

pub type CortexResult<T> = Result<T, CortexError>;
