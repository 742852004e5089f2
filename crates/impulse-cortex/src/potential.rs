// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Ready-made potentials for [`Synapse::with_potential`](crate::Synapse::with_potential).

use crate::activation::Impulse;
use crate::frequency::period_of;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Always passes.
pub fn always() -> impl Fn(&Impulse) -> bool + Send + Sync + 'static {
    |_| true
}

/// Passes on one beat position of every cycle.
pub fn on_beat(beat: u64) -> impl Fn(&Impulse) -> bool + Send + Sync + 'static {
    move |impulse| impulse.beat() == beat
}

/// Passes when `step % modulus == n`. A modulus of 0 never passes.
pub fn nth_step_of(n: u64, modulus: u64) -> impl Fn(&Impulse) -> bool + Send + Sync + 'static {
    move |impulse| modulus != 0 && impulse.step() % modulus == n
}

/// Passes at most once per `interval`, measured on impulse inception.
pub fn every(interval: Duration) -> impl Fn(&Impulse) -> bool + Send + Sync + 'static {
    let last: Mutex<Option<Instant>> = Mutex::new(None);
    move |impulse| {
        let mut last = last.lock();
        let due = last.map_or(true, |prev| {
            impulse.inception().saturating_duration_since(prev) >= interval
        });
        if due {
            *last = Some(impulse.inception());
        }
        due
    }
}

/// Passes at roughly `hz` times per second regardless of the cortex frequency.
///
/// A sub-frequency of 0 passes every impulse.
pub fn at_sub_frequency(hz: f64) -> impl Fn(&Impulse) -> bool + Send + Sync + 'static {
    every(period_of(hz).unwrap_or(Duration::ZERO))
}
