// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared, live-mutable frequency reference.
//!
//! The value is stored as `f64` bits in a single atomic so the coordinator thread can read it
//! every iteration without taking a lock, while any other thread may retune it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cloneable handle to a frequency in Hertz.
///
/// All clones observe the same value. Negative and non-finite inputs are clamped to `0.0`,
/// which disables automatic firing.
#[derive(Debug, Clone)]
pub struct FrequencyRef {
    bits: Arc<AtomicU64>,
}

impl FrequencyRef {
    pub fn new(hz: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(sanitize(hz).to_bits())),
        }
    }

    /// Current frequency in Hertz (never negative).
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Retune the frequency. Visible to running clocks on their next evaluation.
    pub fn set(&self, hz: f64) {
        self.bits.store(sanitize(hz).to_bits(), Ordering::Release);
    }

    /// Period derived from the current frequency, `None` when firing is disabled.
    pub fn period(&self) -> Option<Duration> {
        period_of(self.get())
    }
}

impl Default for FrequencyRef {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl From<f64> for FrequencyRef {
    fn from(hz: f64) -> Self {
        Self::new(hz)
    }
}

fn sanitize(hz: f64) -> f64 {
    if hz.is_finite() && hz > 0.0 {
        hz
    } else {
        0.0
    }
}

/// `1 / hz` as a duration; division by zero means "disabled".
pub(crate) fn period_of(hz: f64) -> Option<Duration> {
    if hz > 0.0 && hz.is_finite() {
        Some(Duration::from_secs_f64(1.0 / hz))
    } else {
        None
    }
}
