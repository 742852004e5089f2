// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bridge-tagged diagnostics.
//!
//! Messages are routed through `tracing` with the bridge attached as a field, so the
//! subscriber configured by the host decides where they end up.

use crate::activation::Bridge;
use std::any::Any;
use std::fmt;
use tracing::{debug, warn};

/// Record a diagnostic message for `bridge`.
pub fn record(bridge: &Bridge, message: fmt::Arguments<'_>) {
    debug!(bridge = %bridge, "{}", message);
}

/// Extract a readable message from a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Log a caught panic from user code (`stage` is potential, action, cleanup or deferral).
pub(crate) fn report_panic(bridge: &Bridge, stage: &str, payload: &(dyn Any + Send)) {
    warn!(
        bridge = %bridge,
        "[SYNAPSE] ⚠️ {} panicked: {}",
        stage,
        panic_message(payload)
    );
}
