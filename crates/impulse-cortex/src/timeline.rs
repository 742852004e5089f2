// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Timeline - bounded, inception-ordered activation history for one synapse.
//!
//! Key semantics:
//! - Bounded: only the most recent `capacity` activations are kept (oldest evicted first).
//! - Ordered: entries are non-decreasing by inception, even when concurrent activations
//!   of a stimulative synapse complete out of order.
//! - Derived metrics are computed on demand against the most recent prior entry; with no prior
//!   entry every derived duration is zero.

use crate::activation::Activation;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Smallest capacity that still allows every derived metric.
pub const MIN_TIMELINE_CAPACITY: usize = 2;

/// Default number of activations retained per synapse.
pub const DEFAULT_TIMELINE_CAPACITY: usize = 16;

/// Durations derived from two consecutive activations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimelineMetrics {
    /// `this.activated − prev.completed`
    pub refractory_period: Duration,
    /// `this.activated − prev.activated`
    pub cycle_period: Duration,
    /// `this.activated − this.inception`
    pub response_time: Duration,
    /// `prev.completed − prev.activated`
    pub run_time: Duration,
    /// `prev.completed − prev.inception`
    pub total_time: Duration,
}

impl TimelineMetrics {
    fn between(prev: &Activation, this: &Activation) -> Self {
        Self {
            refractory_period: this.activated.saturating_duration_since(prev.completed),
            cycle_period: this.activated.saturating_duration_since(prev.activated),
            response_time: this.activated.saturating_duration_since(this.inception),
            run_time: prev.completed.saturating_duration_since(prev.activated),
            total_time: prev.completed.saturating_duration_since(prev.inception),
        }
    }
}

#[derive(Debug)]
pub struct Timeline {
    state: RwLock<TimelineState>,
}

#[derive(Debug)]
struct TimelineState {
    capacity: usize,
    entries: VecDeque<Activation>, // oldest -> newest by inception
    recorded: u64,
}

impl Timeline {
    /// Create a timeline retaining `capacity` entries (at least [`MIN_TIMELINE_CAPACITY`]).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_TIMELINE_CAPACITY);
        Self {
            state: RwLock::new(TimelineState {
                capacity,
                entries: VecDeque::with_capacity(capacity.min(1024)),
                recorded: 0,
            }),
        }
    }

    /// Append an activation, keeping inception order and evicting the oldest when full.
    pub fn record(&self, activation: Activation) {
        let mut state = self.state.write();
        let position = state
            .entries
            .iter()
            .rposition(|entry| entry.inception <= activation.inception)
            .map_or(0, |idx| idx + 1);
        state.entries.insert(position, activation);
        state.recorded += 1;
        while state.entries.len() > state.capacity {
            state.entries.pop_front();
        }
    }

    /// Grow (never shrink below the minimum) the retained window.
    pub fn resize(&self, capacity: usize) {
        let mut state = self.state.write();
        state.capacity = capacity.max(MIN_TIMELINE_CAPACITY);
        while state.entries.len() > state.capacity {
            state.entries.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.state.read().capacity
    }

    /// Entries currently retained.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Activations recorded over the whole lifetime, including evicted ones.
    pub fn recorded(&self) -> u64 {
        self.state.read().recorded
    }

    pub fn latest(&self) -> Option<Activation> {
        self.state.read().entries.back().cloned()
    }

    /// Inception of the most recent entry.
    pub fn latest_inception(&self) -> Option<Instant> {
        self.state.read().entries.back().map(|a| a.inception)
    }

    /// Retained entries, oldest first.
    pub fn snapshot(&self) -> Vec<Activation> {
        self.state.read().entries.iter().cloned().collect()
    }

    /// Metrics of the latest entry against its predecessor.
    pub fn metrics(&self) -> TimelineMetrics {
        let state = self.state.read();
        let len = state.entries.len();
        if len < 2 {
            return TimelineMetrics::default();
        }
        TimelineMetrics::between(&state.entries[len - 2], &state.entries[len - 1])
    }

    pub fn refractory_period(&self) -> Duration {
        self.metrics().refractory_period
    }

    pub fn cycle_period(&self) -> Duration {
        self.metrics().cycle_period
    }

    pub fn response_time(&self) -> Duration {
        self.metrics().response_time
    }

    pub fn run_time(&self) -> Duration {
        self.metrics().run_time
    }

    pub fn total_time(&self) -> Duration {
        self.metrics().total_time
    }

    /// Metrics for every consecutive pair in the retained window.
    pub fn window_metrics(&self) -> Vec<TimelineMetrics> {
        let state = self.state.read();
        state
            .entries
            .iter()
            .zip(state.entries.iter().skip(1))
            .map(|(prev, this)| TimelineMetrics::between(prev, this))
            .collect()
    }

    pub fn cycle_periods(&self) -> Vec<Duration> {
        self.window_metrics()
            .into_iter()
            .map(|m| m.cycle_period)
            .collect()
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(DEFAULT_TIMELINE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::{Counters, Impulse};
    use proptest::prelude::*;

    fn activation_at(base: Instant, step: u64, inception_ms: u64, run_ms: u64) -> Activation {
        let impulse = Impulse::manual("t", Counters { step, beat: 0, cycle: step });
        let mut record = impulse.complete(base, base);
        record.inception = base + Duration::from_millis(inception_ms);
        record.activated = record.inception + Duration::from_millis(1);
        record.completed = record.activated + Duration::from_millis(run_ms);
        record
    }

    #[test]
    fn test_empty_timeline_metrics_are_zero() {
        let timeline = Timeline::new(4);
        assert!(timeline.latest().is_none());
        assert_eq!(timeline.metrics(), TimelineMetrics::default());

        timeline.record(activation_at(Instant::now(), 0, 0, 3));
        assert_eq!(timeline.metrics(), TimelineMetrics::default());
    }

    #[test]
    fn test_derived_metrics_against_previous_entry() {
        let base = Instant::now();
        let timeline = Timeline::new(4);
        timeline.record(activation_at(base, 0, 0, 3)); // activated 1, completed 4
        timeline.record(activation_at(base, 1, 10, 2)); // activated 11, completed 13

        let m = timeline.metrics();
        assert_eq!(m.cycle_period, Duration::from_millis(10));
        assert_eq!(m.refractory_period, Duration::from_millis(7));
        assert_eq!(m.response_time, Duration::from_millis(1));
        assert_eq!(m.run_time, Duration::from_millis(3));
        assert_eq!(m.total_time, Duration::from_millis(4));
    }

    #[test]
    fn test_bounded_eviction_keeps_newest() {
        let base = Instant::now();
        let timeline = Timeline::new(3);
        for step in 0..5 {
            timeline.record(activation_at(base, step, step * 10, 1));
        }
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.recorded(), 5);
        let steps: Vec<u64> = timeline.snapshot().iter().map(|a| a.counters.step).collect();
        assert_eq!(steps, vec![2, 3, 4]);
    }

    #[test]
    fn test_out_of_order_completion_is_reordered() {
        let base = Instant::now();
        let timeline = Timeline::new(8);
        timeline.record(activation_at(base, 1, 20, 1));
        timeline.record(activation_at(base, 0, 10, 30));
        let steps: Vec<u64> = timeline.snapshot().iter().map(|a| a.counters.step).collect();
        assert_eq!(steps, vec![0, 1]);
    }

    #[test]
    fn test_capacity_floor() {
        let timeline = Timeline::new(0);
        assert_eq!(timeline.capacity(), MIN_TIMELINE_CAPACITY);
        timeline.resize(64);
        assert_eq!(timeline.capacity(), 64);
    }

    proptest! {
        #[test]
        fn prop_inception_order_and_non_negative_metrics(
            inceptions in proptest::collection::vec(0u64..1_000, 1..40),
            capacity in 2usize..16,
        ) {
            let base = Instant::now();
            let timeline = Timeline::new(capacity);
            for (step, inception_ms) in inceptions.iter().enumerate() {
                timeline.record(activation_at(base, step as u64, *inception_ms, 2));
            }
            let snapshot = timeline.snapshot();
            prop_assert!(snapshot.len() <= capacity);
            for pair in snapshot.windows(2) {
                prop_assert!(pair[0].inception <= pair[1].inception);
            }
            for record in &snapshot {
                prop_assert!(record.activated >= record.inception);
                prop_assert!(record.completed >= record.activated);
            }
        }
    }
}
