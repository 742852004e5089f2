// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Impulse handles and activation records.
//!
//! An [`Impulse`] is created by the cortex when its clock fires (or on an explicit impulse
//! request) and travels to exactly one synapse. The synapse stamps the activation and
//! completion instants and stores the resulting immutable [`Activation`] in its timeline.

use crate::control::CortexHandle;
use crate::timeline::Timeline;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Diagnostic name chain: `cortex → synapse → neuron`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bridge(Vec<String>);

impl Bridge {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// New chain with `name` appended.
    pub fn extend(&self, name: impl Into<String>) -> Self {
        let mut links = self.0.clone();
        links.push(name.into());
        Self(links)
    }

    pub fn links(&self) -> &[String] {
        &self.0
    }

    /// Innermost name in the chain.
    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl fmt::Display for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" → "))
    }
}

/// Step / beat / cycle counters attached to every impulse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Counters {
    /// Monotonic across all impulses of a cortex.
    pub step: u64,
    /// 0-based position within the current cycle.
    pub beat: u64,
    /// Increments whenever the beat wraps.
    pub cycle: u64,
}

impl Counters {
    /// Move to the next step of a ring with `size` beats per cycle.
    pub fn advance(&mut self, size: u64) {
        self.step += 1;
        self.beat += 1;
        if self.beat >= size.max(1) {
            self.beat = 0;
            self.cycle += 1;
        }
    }
}

/// Handle passed to potentials and actions.
///
/// Everything is read-only except the decay request.
#[derive(Debug, Clone)]
pub struct Impulse {
    id: Uuid,
    bridge: Bridge,
    cortex_created: Instant,
    inception: Instant,
    counters: Counters,
    period: Option<Duration>,
    frequency: f64,
    decay: bool,
    timeline: Option<Arc<Timeline>>,
    cortex: Option<CortexHandle>,
}

impl Impulse {
    pub(crate) fn issue(
        bridge: Bridge,
        cortex_created: Instant,
        inception: Instant,
        counters: Counters,
        period: Option<Duration>,
        frequency: f64,
        cortex: Option<CortexHandle>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            bridge,
            cortex_created,
            inception,
            counters,
            period,
            frequency,
            decay: false,
            timeline: None,
            cortex,
        }
    }

    /// An impulse that no cortex issued, incepted now.
    ///
    /// Useful for evaluating potentials or driving actions outside a running cortex.
    pub fn manual(name: impl Into<String>, counters: Counters) -> Self {
        let now = Instant::now();
        Self::issue(Bridge::root(name), now, now, counters, None, 0.0, None)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn cortex_created(&self) -> Instant {
        self.cortex_created
    }

    /// When the clock decided to fire.
    pub fn inception(&self) -> Instant {
        self.inception
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn step(&self) -> u64 {
        self.counters.step
    }

    pub fn beat(&self) -> u64 {
        self.counters.beat
    }

    pub fn cycle(&self) -> u64 {
        self.counters.cycle
    }

    /// Cortex period at inception (`None` when automatic firing was disabled).
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Timeline of the receiving synapse, bound once the impulse reaches it.
    pub fn timeline(&self) -> Option<&Timeline> {
        self.timeline.as_deref()
    }

    /// Control handle of the issuing cortex.
    pub fn cortex(&self) -> Option<&CortexHandle> {
        self.cortex.as_ref()
    }

    /// Request removal of the receiving synapse once this activation returns.
    pub fn decay(&mut self) {
        self.decay = true;
    }

    pub fn is_decaying(&self) -> bool {
        self.decay
    }

    /// Fresh copy for a nested receiver; it binds its own name and timeline.
    pub(crate) fn relay(&self) -> Self {
        Self {
            id: Uuid::now_v7(),
            decay: false,
            timeline: None,
            ..self.clone()
        }
    }

    pub(crate) fn bind(&mut self, name: &str, timeline: Arc<Timeline>) {
        self.bridge = self.bridge.extend(name);
        self.timeline = Some(timeline);
    }

    pub(crate) fn complete(&self, activated: Instant, completed: Instant) -> Activation {
        Activation {
            id: self.id,
            bridge: self.bridge.clone(),
            cortex_created: self.cortex_created,
            inception: self.inception,
            activated,
            completed,
            counters: self.counters,
            period: self.period,
            frequency: self.frequency,
        }
    }
}

/// Immutable record of one activation.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub id: Uuid,
    pub bridge: Bridge,
    pub cortex_created: Instant,
    pub inception: Instant,
    /// When the action started.
    pub activated: Instant,
    /// When the action returned (or panicked).
    pub completed: Instant,
    pub counters: Counters,
    pub period: Option<Duration>,
    pub frequency: f64,
}

impl Activation {
    /// `activated − inception`.
    pub fn response_time(&self) -> Duration {
        self.activated.saturating_duration_since(self.inception)
    }

    /// `completed − activated`.
    pub fn run_time(&self) -> Duration {
        self.completed.saturating_duration_since(self.activated)
    }

    /// `completed − inception`.
    pub fn total_time(&self) -> Duration {
        self.completed.saturating_duration_since(self.inception)
    }
}
