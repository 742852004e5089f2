// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Impulse Clock
//!
//! Decides when the cortex fires its next impulse.
//!
//! ## Design
//! - Reads the live [`FrequencyRef`] on every evaluation (runtime retuning)
//! - Feedback-adjusted: the overshoot past a deadline is subtracted from the next wait
//! - Drift feedback is only trusted when the wake-up came from the timer itself and the
//!   frequency did not change since the previous evaluation
//! - A frequency of 0 disables automatic firing

use crate::frequency::{period_of, FrequencyRef};
use std::time::{Duration, Instant};

/// Upper bound for a single coordinator wait so retuning and shutdown are noticed promptly.
pub const MAX_WAIT: Duration = Duration::from_millis(50);

/// Result of one clock evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockDecision {
    /// Fire an impulse now.
    pub fire: bool,
    /// Suggested wait before the next evaluation; `None` when firing is disabled.
    pub delay: Option<Duration>,
}

impl ClockDecision {
    /// Suggested wait, bounded by [`MAX_WAIT`].
    pub fn bounded_delay(&self) -> Duration {
        self.delay.map_or(MAX_WAIT, |d| d.min(MAX_WAIT))
    }
}

#[derive(Debug)]
pub struct Clock {
    frequency: FrequencyRef,
    cached_hz: f64,
    period: Option<Duration>,
    last_fire: Instant,
    deadline: Option<Instant>,
    adjustable: bool,
    frequency_changed: bool,
}

impl Clock {
    pub fn new(frequency: FrequencyRef, now: Instant) -> Self {
        let cached_hz = frequency.get();
        let period = period_of(cached_hz);
        Self {
            frequency,
            cached_hz,
            period,
            last_fire: now,
            deadline: period.map(|p| now + p),
            adjustable: false,
            frequency_changed: false,
        }
    }

    /// Period in effect after the last evaluation.
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Frequency in effect after the last evaluation.
    pub fn frequency_hz(&self) -> f64 {
        self.cached_hz
    }

    pub fn frequency(&self) -> &FrequencyRef {
        &self.frequency
    }

    pub fn last_fire(&self) -> Instant {
        self.last_fire
    }

    /// Mark whether the current wake-up was caused by the timer (`true`) or by another event.
    pub fn set_adjustable(&mut self, adjustable: bool) {
        self.adjustable = adjustable;
    }

    /// Should the cortex fire at `now`?
    pub fn evaluate(&mut self, now: Instant) -> ClockDecision {
        let hz = self.frequency.get();
        if hz != self.cached_hz {
            self.cached_hz = hz;
            self.period = period_of(hz);
            self.deadline = self.period.map(|p| self.last_fire + p);
            self.frequency_changed = true;
            return ClockDecision {
                fire: false,
                delay: self.remaining(now),
            };
        }

        let (Some(period), Some(deadline)) = (self.period, self.deadline) else {
            return ClockDecision {
                fire: false,
                delay: None,
            };
        };

        if now < deadline {
            return ClockDecision {
                fire: false,
                delay: Some(deadline - now),
            };
        }

        let overshoot = now - deadline;
        let trust_drift = self.adjustable && !self.frequency_changed;
        // Overshoot beyond a full period is a stall, not drift: resume from now.
        let delay = if trust_drift && overshoot < period {
            period - overshoot
        } else {
            period
        };

        self.last_fire = now;
        self.deadline = Some(now + delay);
        self.frequency_changed = false;

        ClockDecision {
            fire: true,
            delay: Some(delay),
        }
    }

    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}
