// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Synapses
//!
//! A synapse is a named, lifecycle-typed action. Once registered with a cortex it runs on
//! its own worker thread and receives impulses through a small bounded mailbox.
//!
//! Per delivered impulse the worker:
//! 1. skips impulses older than one cortex period (stale),
//! 2. checks the potential and the once-per-cycle gate,
//! 3. runs the action (inline, or on a fresh thread for stimulative synapses),
//! 4. reports back to its owner: `Recycle` to stay in rotation, `Decayed` to leave it.
//!
//! User code (potential, action, cleanup) runs inside `catch_unwind`; a panic is logged and
//! never takes the worker down.

use crate::activation::{Bridge, Impulse};
use crate::diagnostic::{self, report_panic};
use crate::error::{CortexError, CortexResult};
use crate::timeline::{Timeline, DEFAULT_TIMELINE_CAPACITY};
use crossbeam::channel::{Receiver, Sender};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::warn;
use uuid::Uuid;

type ActionFn = dyn Fn(&mut Impulse) + Send + Sync;
type PotentialFn = dyn Fn(&Impulse) -> bool + Send + Sync;
type CleanupFn = dyn Fn() + Send + Sync;

/// How a synapse behaves after an activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Runs inline and stays until an action requests decay.
    #[default]
    Looping,
    /// Every activation gets its own thread; activations may overlap.
    Stimulative,
    /// Removed after its first successful activation.
    Triggered,
    /// Gets exactly one attempt, whether or not the potential passes.
    Impulse,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Looping => "looping",
            Lifecycle::Stimulative => "stimulative",
            Lifecycle::Triggered => "triggered",
            Lifecycle::Impulse => "impulse",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifecycle {
    type Err = CortexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "looping" => Ok(Lifecycle::Looping),
            "stimulative" => Ok(Lifecycle::Stimulative),
            "triggered" => Ok(Lifecycle::Triggered),
            "impulse" => Ok(Lifecycle::Impulse),
            _ => Err(CortexError::InvalidLifecycle(s.to_string())),
        }
    }
}

/// Worker-to-owner report, one per delivered impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Feedback {
    /// Put the synapse back into rotation.
    Recycle(Uuid),
    /// The synapse is finished; forget it.
    Decayed(Uuid),
}

#[derive(Debug)]
struct SynapseState {
    timeline: Arc<Timeline>,
    missed: AtomicU64,
    decayed: AtomicBool,
    in_flight: AtomicUsize,
}

pub struct Synapse {
    id: Uuid,
    name: Arc<str>,
    lifecycle: Lifecycle,
    action: Arc<ActionFn>,
    potential: Option<Arc<PotentialFn>>,
    cleanup: Option<Arc<CleanupFn>>,
    state: Arc<SynapseState>,
    explicit_capacity: bool,
    /// Cycle of the last activation; a synapse fires at most once per cycle.
    last_cycle: Option<u64>,
}

impl Synapse {
    pub fn new<F>(lifecycle: Lifecycle, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut Impulse) + Send + Sync + 'static,
    {
        let name: String = name.into();
        Self {
            id: Uuid::now_v7(),
            name: Arc::from(name),
            lifecycle,
            action: Arc::new(action),
            potential: None,
            cleanup: None,
            state: Arc::new(SynapseState {
                timeline: Arc::new(Timeline::new(DEFAULT_TIMELINE_CAPACITY)),
                missed: AtomicU64::new(0),
                decayed: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
            }),
            explicit_capacity: false,
            last_cycle: None,
        }
    }

    /// Gate activations. Without a potential every impulse passes.
    pub fn with_potential<P>(mut self, potential: P) -> Self
    where
        P: Fn(&Impulse) -> bool + Send + Sync + 'static,
    {
        self.potential = Some(Arc::new(potential));
        self
    }

    /// Runs exactly once when the synapse decays or its cortex shuts down.
    pub fn with_cleanup<C>(mut self, cleanup: C) -> Self
    where
        C: Fn() + Send + Sync + 'static,
    {
        self.cleanup = Some(Arc::new(cleanup));
        self
    }

    /// Fix the timeline window instead of taking the cortex default.
    pub fn with_timeline_capacity(mut self, capacity: usize) -> Self {
        self.state.timeline.resize(capacity);
        self.explicit_capacity = true;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn timeline(&self) -> &Timeline {
        &self.state.timeline
    }

    /// Observer that stays valid after the synapse is handed to a cortex.
    pub fn probe(&self) -> SynapseProbe {
        SynapseProbe {
            id: self.id,
            name: Arc::clone(&self.name),
            lifecycle: self.lifecycle,
            state: Arc::clone(&self.state),
        }
    }

    pub(crate) fn has_explicit_timeline_capacity(&self) -> bool {
        self.explicit_capacity
    }

    /// Process one delivered impulse. Always sends at least one [`Feedback`] for this synapse.
    pub(crate) fn stimulate(&mut self, mut impulse: Impulse, feedback: &Sender<Feedback>) {
        if self.state.decayed.load(Ordering::Acquire) {
            let _ = feedback.send(Feedback::Decayed(self.id));
            return;
        }
        impulse.bind(&self.name, Arc::clone(&self.state.timeline));

        if let Some(period) = impulse.period() {
            let age = impulse.inception().elapsed();
            if age > period {
                diagnostic::record(
                    impulse.bridge(),
                    format_args!("stale impulse skipped ({:?} old, period {:?})", age, period),
                );
                self.recycle(feedback);
                return;
            }
        }

        if self.last_cycle.is_some_and(|last| impulse.cycle() <= last) {
            self.recycle(feedback);
            return;
        }

        if !self.potential_allows(&impulse) {
            if self.lifecycle == Lifecycle::Impulse {
                self.retire(impulse.bridge(), feedback);
            } else {
                self.recycle(feedback);
            }
            return;
        }
        self.last_cycle = Some(impulse.cycle());

        match self.lifecycle {
            Lifecycle::Looping => {
                fire(self.action.as_ref(), &self.state, &mut impulse);
                if impulse.is_decaying() {
                    self.retire(impulse.bridge(), feedback);
                } else {
                    self.recycle(feedback);
                }
            }
            Lifecycle::Triggered | Lifecycle::Impulse => {
                fire(self.action.as_ref(), &self.state, &mut impulse);
                self.retire(impulse.bridge(), feedback);
            }
            Lifecycle::Stimulative => {
                self.spawn_activation(impulse, feedback);
                self.recycle(feedback);
            }
        }
    }

    /// Final cleanup when the owner shuts down without this synapse having decayed.
    pub(crate) fn close(&self, bridge: &Bridge) {
        if !self.state.decayed.swap(true, Ordering::AcqRel) {
            run_cleanup(self.cleanup.as_deref(), bridge);
        }
    }

    fn potential_allows(&self, impulse: &Impulse) -> bool {
        let Some(potential) = self.potential.as_deref() else {
            return true;
        };
        match catch_unwind(AssertUnwindSafe(|| potential(impulse))) {
            Ok(pass) => pass,
            Err(payload) => {
                report_panic(impulse.bridge(), "potential", payload.as_ref());
                false
            }
        }
    }

    fn spawn_activation(&self, mut impulse: Impulse, feedback: &Sender<Feedback>) {
        let id = self.id;
        let action = Arc::clone(&self.action);
        let cleanup = self.cleanup.clone();
        let state = Arc::clone(&self.state);
        let feedback = feedback.clone();

        let spawned = thread::Builder::new()
            .name(format!("stimulus-{}", self.name))
            .spawn(move || {
                fire(action.as_ref(), &state, &mut impulse);
                if impulse.is_decaying() {
                    retire(id, &state, cleanup.as_deref(), impulse.bridge(), &feedback);
                }
            });
        if let Err(e) = spawned {
            warn!(
                "[SYNAPSE] ⚠️ Failed to spawn activation thread for '{}': {}",
                self.name,
                e
            );
        }
    }

    fn recycle(&self, feedback: &Sender<Feedback>) {
        let _ = feedback.send(Feedback::Recycle(self.id));
    }

    fn retire(&self, bridge: &Bridge, feedback: &Sender<Feedback>) {
        retire(self.id, &self.state, self.cleanup.as_deref(), bridge, feedback);
    }
}

impl fmt::Debug for Synapse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synapse")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("lifecycle", &self.lifecycle)
            .field("has_potential", &self.potential.is_some())
            .field("has_cleanup", &self.cleanup.is_some())
            .field("last_cycle", &self.last_cycle)
            .finish()
    }
}

/// Read-only view of a synapse's timeline and counters.
#[derive(Debug, Clone)]
pub struct SynapseProbe {
    id: Uuid,
    name: Arc<str>,
    lifecycle: Lifecycle,
    state: Arc<SynapseState>,
}

impl SynapseProbe {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn timeline(&self) -> &Timeline {
        &self.state.timeline
    }

    /// Lifetime activation count.
    pub fn recorded(&self) -> u64 {
        self.state.timeline.recorded()
    }

    /// Impulses dropped because the mailbox was full.
    pub fn missed(&self) -> u64 {
        self.state.missed.load(Ordering::Relaxed)
    }

    pub fn is_decayed(&self) -> bool {
        self.state.decayed.load(Ordering::Acquire)
    }

    /// Activations currently executing.
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn note_missed(&self) {
        self.state.missed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Start the worker thread that drains `mailbox` until its sender side is dropped.
pub(crate) fn spawn_worker(
    mut synapse: Synapse,
    cortex: &str,
    mailbox: Receiver<Impulse>,
    feedback: Sender<Feedback>,
) -> CortexResult<()> {
    let bridge = Bridge::root(cortex).extend(synapse.name());
    let name = synapse.name().to_string();
    thread::Builder::new()
        .name(format!("synapse-{}", name))
        .spawn(move || {
            for impulse in mailbox.iter() {
                synapse.stimulate(impulse, &feedback);
            }
            synapse.close(&bridge);
        })
        .map(|_| ())
        .map_err(|source| CortexError::Spawn {
            role: "synapse",
            name,
            source,
        })
}

fn fire(action: &ActionFn, state: &SynapseState, impulse: &mut Impulse) {
    state.in_flight.fetch_add(1, Ordering::AcqRel);
    let activated = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| action(impulse)));
    let completed = Instant::now();
    if let Err(payload) = outcome {
        report_panic(impulse.bridge(), "action", payload.as_ref());
    }
    state.timeline.record(impulse.complete(activated, completed));
    state.in_flight.fetch_sub(1, Ordering::AcqRel);
}

fn retire(
    id: Uuid,
    state: &SynapseState,
    cleanup: Option<&CleanupFn>,
    bridge: &Bridge,
    feedback: &Sender<Feedback>,
) {
    // Concurrent stimulative activations may all request decay; only the first cleans up.
    if !state.decayed.swap(true, Ordering::AcqRel) {
        run_cleanup(cleanup, bridge);
        diagnostic::record(bridge, format_args!("synapse decayed"));
    }
    let _ = feedback.send(Feedback::Decayed(id));
}

fn run_cleanup(cleanup: Option<&CleanupFn>, bridge: &Bridge) {
    if let Some(cleanup) = cleanup {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(cleanup)) {
            report_panic(bridge, "cleanup", payload.as_ref());
        }
    }
}
