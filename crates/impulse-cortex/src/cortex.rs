// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Cortex
//!
//! Owns a set of synapses and fires impulses at them, one per clock tick, in round-robin order.
//!
//! ## Design
//! - A dedicated coordinator thread owns the ring, the registry and the counters
//! - All mutation arrives as [`Control`] messages on one bounded channel
//! - Synapses report back on an internal feedback channel; a synapse is out of the ring
//!   while its impulse is being processed
//! - Before spark, and while muted, control messages are held and replayed in arrival order
//! - Waits are capped at [`MAX_WAIT`] so retuning and shutdown are noticed promptly

use crate::activation::{Bridge, Counters, Impulse};
use crate::clock::{Clock, MAX_WAIT};
use crate::control::{Control, CortexHandle, Deferral};
use crate::diagnostic::panic_message;
use crate::error::{CortexError, CortexResult};
use crate::frequency::FrequencyRef;
use crate::keep_alive;
use crate::synapse::{self, Feedback, Synapse, SynapseProbe};
use crate::timeline::DEFAULT_TIMELINE_CAPACITY;
use ahash::AHashMap;
use crossbeam::channel::{after, bounded, select, unbounded, Receiver, Sender, TrySendError};
use crossbeam::sync::WaitGroup;
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const DEFAULT_CHANNEL_LIMIT: usize = 1024;
pub const DEFAULT_MAILBOX_CAPACITY: usize = 8;

const RATE_REPORT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CortexConfig {
    /// Control channel capacity.
    pub channel_limit: usize,
    /// Impulses a synapse may have queued before further ones are dropped.
    pub mailbox_capacity: usize,
    /// Timeline window given to synapses that did not pick their own.
    pub timeline_capacity: usize,
    /// Fixed beats per cycle. `None` uses the number of registered synapses.
    pub phase: Option<u64>,
}

impl Default for CortexConfig {
    fn default() -> Self {
        Self {
            channel_limit: DEFAULT_CHANNEL_LIMIT,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            timeline_capacity: DEFAULT_TIMELINE_CAPACITY,
            phase: None,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CortexState {
    Unsparked = 0,
    Running = 1,
    Muted = 2,
    Terminated = 3,
}

impl CortexState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CortexState::Running,
            2 => CortexState::Muted,
            3 => CortexState::Terminated,
            _ => CortexState::Unsparked,
        }
    }
}

/// Lock-free snapshot of the coordinator, updated as it runs.
#[derive(Debug, Default)]
pub struct CortexStats {
    state: AtomicU8,
    step: AtomicU64,
    beat: AtomicU64,
    cycle: AtomicU64,
    active: AtomicUsize,
    held: AtomicUsize,
    fires: AtomicU64,
    dropped: AtomicU64,
}

impl CortexStats {
    pub fn state(&self) -> CortexState {
        CortexState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Counters the next impulse will carry.
    pub fn counters(&self) -> Counters {
        Counters {
            step: self.step.load(Ordering::Acquire),
            beat: self.beat.load(Ordering::Acquire),
            cycle: self.cycle.load(Ordering::Acquire),
        }
    }

    /// Registered synapses, including those with an impulse in flight.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Control messages waiting for spark or unmute.
    pub fn held(&self) -> usize {
        self.held.load(Ordering::Acquire)
    }

    /// Impulses issued, delivered or not.
    pub fn fires(&self) -> u64 {
        self.fires.load(Ordering::Acquire)
    }

    /// Impulses dropped on a full synapse mailbox.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Acquire)
    }

    fn set_state(&self, state: CortexState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct Cortex {
    name: Arc<str>,
    created: Instant,
    frequency: FrequencyRef,
    handle: CortexHandle,
    stats: Arc<CortexStats>,
    force_decay: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Cortex {
    pub fn new(name: impl Into<String>, frequency: impl Into<FrequencyRef>) -> CortexResult<Self> {
        Self::with_config(name, frequency, CortexConfig::default())
    }

    /// Start the coordinator thread. The cortex stays unsparked until [`Cortex::spark`].
    pub fn with_config(
        name: impl Into<String>,
        frequency: impl Into<FrequencyRef>,
        config: CortexConfig,
    ) -> CortexResult<Self> {
        if config.phase == Some(0) {
            return Err(CortexError::InvalidPhase);
        }
        let name: Arc<str> = Arc::from(name.into());
        let frequency = frequency.into();
        let created = Instant::now();

        let (control_tx, control_rx) = bounded(config.channel_limit.max(1));
        let handle = CortexHandle::new(Arc::clone(&name), control_tx);
        let stats = Arc::new(CortexStats::default());
        let force_decay = Arc::new(AtomicBool::new(false));

        let process_handle = handle.clone();
        let process_force = Arc::clone(&force_decay);
        let process_deferral = keep_alive::defer(move |group| {
            process_force.store(true, Ordering::Release);
            // Already terminated: the message and its wait-group member are simply dropped.
            let _ = process_handle.send(Control::Decay(Some(group)));
        });

        let coordinator = CortexLoop::new(
            Arc::clone(&name),
            created,
            frequency.clone(),
            config,
            handle.clone(),
            control_rx,
            Arc::clone(&stats),
            Arc::clone(&force_decay),
            process_deferral,
        );

        let thread_handle = thread::Builder::new()
            .name(format!("cortex-{}", name))
            .spawn(move || coordinator.run())
            .map_err(|source| {
                keep_alive::undefer(process_deferral);
                CortexError::Spawn {
                    role: "cortex",
                    name: name.to_string(),
                    source,
                }
            })?;

        info!(
            "[CORTEX] Created '{}' at {:.2} Hz",
            name,
            frequency.get()
        );

        Ok(Self {
            name,
            created,
            frequency,
            handle,
            stats,
            force_decay,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    pub fn frequency(&self) -> &FrequencyRef {
        &self.frequency
    }

    /// Retune; the clock picks the new value up on its next evaluation.
    pub fn set_frequency(&self, hz: f64) {
        self.frequency.set(hz);
        info!("[CORTEX] '{}' frequency set to {:.2} Hz", self.name, self.frequency.get());
    }

    pub fn handle(&self) -> CortexHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> &CortexStats {
        &self.stats
    }

    pub fn state(&self) -> CortexState {
        self.stats.state()
    }

    pub fn spark(&self, synapses: Vec<Synapse>) -> CortexResult<()> {
        self.handle.spark(synapses)
    }

    pub fn mute(&self) -> CortexResult<()> {
        self.handle.mute()
    }

    pub fn unmute(&self) -> CortexResult<()> {
        self.handle.unmute()
    }

    pub fn add_synapse(&self, synapse: Synapse) -> CortexResult<()> {
        self.handle.add_synapse(synapse)
    }

    /// Fire one impulse now, independent of the clock.
    pub fn impulse(&self) -> CortexResult<()> {
        self.handle.impulse()
    }

    pub fn defer<F>(&self, deferral: F) -> CortexResult<()>
    where
        F: FnOnce(WaitGroup) + Send + 'static,
    {
        self.handle.defer(deferral)
    }

    /// Tear the cortex down and wait for the coordinator to exit.
    ///
    /// Unlike a `Decay` message sent through a handle, this is not held while the cortex is
    /// muted or unsparked. Calling it again is a no-op.
    pub fn decay(&mut self) -> CortexResult<()> {
        let Some(thread_handle) = self.thread_handle.take() else {
            return Ok(());
        };
        self.force_decay.store(true, Ordering::Release);
        // Fails only when the coordinator already exited.
        let _ = self.handle.send(Control::Decay(None));
        thread_handle
            .join()
            .map_err(|_| CortexError::CoordinatorPanicked(self.name.to_string()))
    }
}

impl Drop for Cortex {
    fn drop(&mut self) {
        if let Err(e) = self.decay() {
            warn!("[CORTEX] ⚠️ {}", e);
        }
    }
}

struct SynapseSlot {
    mailbox: Sender<Impulse>,
    probe: SynapseProbe,
}

enum Wake {
    Control(Control),
    Feedback(Feedback),
    Timer,
    Closed,
}

enum Delivery {
    Sent,
    Full,
    Gone,
}

struct CortexLoop {
    name: Arc<str>,
    created: Instant,
    clock: Clock,
    config: CortexConfig,
    handle: CortexHandle,
    control: Receiver<Control>,
    feedback_tx: Sender<Feedback>,
    feedback_rx: Receiver<Feedback>,
    /// Replayed messages; drained before the channel.
    pending: VecDeque<Control>,
    held: Vec<Control>,
    sparked: bool,
    muted: bool,
    /// Synapses ready for their next impulse, in delivery order.
    ring: VecDeque<Uuid>,
    synapses: AHashMap<Uuid, SynapseSlot>,
    counters: Counters,
    deferrals: Vec<Deferral>,
    stats: Arc<CortexStats>,
    force_decay: Arc<AtomicBool>,
    process_deferral: Uuid,
    last_report: Instant,
    fires_since_report: u64,
}

impl CortexLoop {
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: Arc<str>,
        created: Instant,
        frequency: FrequencyRef,
        config: CortexConfig,
        handle: CortexHandle,
        control: Receiver<Control>,
        stats: Arc<CortexStats>,
        force_decay: Arc<AtomicBool>,
        process_deferral: Uuid,
    ) -> Self {
        let (feedback_tx, feedback_rx) = unbounded();
        Self {
            name,
            created,
            clock: Clock::new(frequency, created),
            config,
            handle,
            control,
            feedback_tx,
            feedback_rx,
            pending: VecDeque::new(),
            held: Vec::new(),
            sparked: false,
            muted: false,
            ring: VecDeque::new(),
            synapses: AHashMap::new(),
            counters: Counters::default(),
            deferrals: Vec::new(),
            stats,
            force_decay,
            process_deferral,
            last_report: created,
            fires_since_report: 0,
        }
    }

    fn run(mut self) {
        debug!("[CORTEX] '{}' coordinator thread started", self.name);
        let mut delay = MAX_WAIT;
        let signal = loop {
            match self.wait(delay) {
                Wake::Timer => self.clock.set_adjustable(true),
                Wake::Feedback(feedback) => {
                    self.clock.set_adjustable(false);
                    self.absorb(feedback);
                }
                Wake::Control(msg) => {
                    self.clock.set_adjustable(false);
                    if let ControlFlow::Break(signal) = self.route(msg) {
                        break signal;
                    }
                }
                Wake::Closed => break None,
            }
            delay = self.tick();
        };
        self.terminate(signal);
    }

    fn wait(&mut self, delay: Duration) -> Wake {
        if let Some(msg) = self.pending.pop_front() {
            return Wake::Control(msg);
        }
        if self.muted {
            select! {
                recv(self.control) -> msg => msg.map_or(Wake::Closed, Wake::Control),
                recv(self.feedback_rx) -> feedback => feedback.map_or(Wake::Closed, Wake::Feedback),
            }
        } else {
            select! {
                recv(self.control) -> msg => msg.map_or(Wake::Closed, Wake::Control),
                recv(self.feedback_rx) -> feedback => feedback.map_or(Wake::Closed, Wake::Feedback),
                recv(after(delay)) -> _ => Wake::Timer,
            }
        }
    }

    /// Evaluate the clock and fire if due. Returns the next wait.
    fn tick(&mut self) -> Duration {
        if !self.sparked || self.muted || !keep_alive::alive() {
            return MAX_WAIT;
        }
        let now = Instant::now();
        let decision = self.clock.evaluate(now);
        if decision.fire {
            self.emit(now);
        }
        decision.bounded_delay()
    }

    fn route(&mut self, msg: Control) -> ControlFlow<Option<WaitGroup>> {
        let msg = match msg {
            Control::Defer(deferral) => {
                self.deferrals.push(deferral);
                return ControlFlow::Continue(());
            }
            // Owner teardown and process shutdown bypass holding.
            Control::Decay(signal)
                if self.force_decay.load(Ordering::Acquire) || !keep_alive::alive() =>
            {
                return ControlFlow::Break(signal);
            }
            other => other,
        };

        if self.muted {
            match msg {
                Control::Unmute => self.unmute(),
                Control::Mute => {}
                other => self.hold(other),
            }
            return ControlFlow::Continue(());
        }

        if !self.sparked && !matches!(msg, Control::Spark(_)) {
            self.hold(msg);
            return ControlFlow::Continue(());
        }

        match msg {
            Control::Spark(seeds) => self.spark(seeds),
            Control::Mute => {
                self.muted = true;
                self.stats.set_state(CortexState::Muted);
                info!("[CORTEX] '{}' muted", self.name);
            }
            Control::Unmute => {}
            Control::SynapseAdded(synapse) => self.register(synapse),
            Control::Impulse => self.emit(Instant::now()),
            Control::Decay(signal) => return ControlFlow::Break(signal),
            Control::Defer(deferral) => self.deferrals.push(deferral),
        }
        ControlFlow::Continue(())
    }

    fn hold(&mut self, msg: Control) {
        debug!("[CORTEX] '{}' holding {}", self.name, msg.kind());
        self.held.push(msg);
        self.stats.held.store(self.held.len(), Ordering::Release);
    }

    /// Queue held messages ahead of anything not yet processed, preserving arrival order.
    fn replay(&mut self, front: impl IntoIterator<Item = Control>) {
        let mut replay: VecDeque<Control> = front.into_iter().collect();
        replay.extend(self.held.drain(..));
        replay.extend(self.pending.drain(..));
        self.pending = replay;
        self.stats.held.store(0, Ordering::Release);
    }

    fn spark(&mut self, seeds: Vec<Synapse>) {
        if self.sparked {
            warn!(
                "[CORTEX] ⚠️ '{}' already sparked, registering {} seed synapses",
                self.name,
                seeds.len()
            );
        } else {
            info!(
                "[CORTEX] '{}' sparked with {} synapses ({} held messages)",
                self.name,
                seeds.len(),
                self.held.len()
            );
        }
        self.sparked = true;
        self.stats.set_state(CortexState::Running);
        self.replay(seeds.into_iter().map(Control::SynapseAdded));
    }

    fn unmute(&mut self) {
        info!(
            "[CORTEX] '{}' unmuted, replaying {} held messages",
            self.name,
            self.held.len()
        );
        self.muted = false;
        self.stats.set_state(CortexState::Running);
        self.replay(std::iter::empty());
    }

    fn register(&mut self, synapse: Synapse) {
        if !synapse.has_explicit_timeline_capacity() {
            synapse.timeline().resize(self.config.timeline_capacity);
        }
        let probe = synapse.probe();
        let (mailbox, inbox) = bounded(self.config.mailbox_capacity.max(1));
        if let Err(e) = synapse::spawn_worker(synapse, &self.name, inbox, self.feedback_tx.clone()) {
            error!("[CORTEX] ❌ '{}': {}", self.name, e);
            return;
        }
        debug!(
            "[CORTEX] '{}' registered {} synapse '{}'",
            self.name,
            probe.lifecycle(),
            probe.name()
        );
        self.ring.push_back(probe.id());
        self.synapses.insert(probe.id(), SynapseSlot { mailbox, probe });
        self.stats.active.store(self.synapses.len(), Ordering::Release);
    }

    fn absorb(&mut self, feedback: Feedback) {
        match feedback {
            Feedback::Recycle(id) => {
                if self.synapses.contains_key(&id) && !self.ring.contains(&id) {
                    self.ring.push_back(id);
                }
            }
            Feedback::Decayed(id) => {
                if let Some(slot) = self.synapses.remove(&id) {
                    self.ring.retain(|queued| *queued != id);
                    self.stats.active.store(self.synapses.len(), Ordering::Release);
                    debug!(
                        "[CORTEX] '{}' synapse '{}' decayed ({} remaining)",
                        self.name,
                        slot.probe.name(),
                        self.synapses.len()
                    );
                }
            }
        }
    }

    fn emit(&mut self, inception: Instant) {
        let impulse = Impulse::issue(
            Bridge::root(&*self.name),
            self.created,
            inception,
            self.counters,
            self.clock.period(),
            self.clock.frequency_hz(),
            Some(self.handle.clone()),
        );
        if let Some(id) = self.ring.pop_front() {
            self.deliver(id, impulse);
        }
        self.advance();
        self.report_rate(inception);
    }

    fn deliver(&mut self, id: Uuid, impulse: Impulse) {
        let Some(slot) = self.synapses.get(&id) else {
            return;
        };
        let delivery = match slot.mailbox.try_send(impulse) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => {
                slot.probe.note_missed();
                Delivery::Full
            }
            Err(TrySendError::Disconnected(_)) => Delivery::Gone,
        };
        match delivery {
            Delivery::Sent => {}
            Delivery::Full => {
                let dropped = self.stats.dropped.fetch_add(1, Ordering::AcqRel) + 1;
                debug!(
                    "[CORTEX] '{}' mailbox full, impulse dropped ({} total)",
                    self.name, dropped
                );
                self.ring.push_back(id);
            }
            Delivery::Gone => {
                warn!("[CORTEX] ⚠️ '{}' synapse worker exited unexpectedly", self.name);
                self.synapses.remove(&id);
                self.stats.active.store(self.synapses.len(), Ordering::Release);
            }
        }
    }

    fn advance(&mut self) {
        let size = self.config.phase.unwrap_or(self.synapses.len() as u64);
        self.counters.advance(size);
        self.stats.step.store(self.counters.step, Ordering::Release);
        self.stats.beat.store(self.counters.beat, Ordering::Release);
        self.stats.cycle.store(self.counters.cycle, Ordering::Release);
        self.stats.fires.fetch_add(1, Ordering::AcqRel);
    }

    fn report_rate(&mut self, now: Instant) {
        self.fires_since_report += 1;
        let elapsed = now.saturating_duration_since(self.last_report);
        if elapsed < RATE_REPORT_INTERVAL {
            return;
        }
        let actual_hz = self.fires_since_report as f64 / elapsed.as_secs_f64();
        debug!(
            "[CORTEX] '{}' rate: {:.2} Hz actual vs {:.2} Hz target ({} synapses, {} dropped)",
            self.name,
            actual_hz,
            self.clock.frequency_hz(),
            self.synapses.len(),
            self.stats.dropped()
        );
        self.last_report = now;
        self.fires_since_report = 0;
    }

    fn terminate(mut self, signal: Option<WaitGroup>) {
        info!(
            "[CORTEX] '{}' decaying: {} deferrals, {} synapses",
            self.name,
            self.deferrals.len(),
            self.synapses.len()
        );

        let group = WaitGroup::new();
        for (idx, deferral) in self.deferrals.drain(..).enumerate() {
            let member = group.clone();
            if let Err(payload) = catch_unwind(AssertUnwindSafe(move || deferral(member))) {
                warn!(
                    "[CORTEX] ⚠️ '{}' deferral {} panicked: {}",
                    self.name,
                    idx,
                    panic_message(payload.as_ref())
                );
            }
        }
        group.wait();

        self.close_unregistered();

        // Dropping the mailboxes lets every worker run its cleanup and exit.
        self.ring.clear();
        self.synapses.clear();

        self.stats.active.store(0, Ordering::Release);
        self.stats.held.store(0, Ordering::Release);
        self.stats.set_state(CortexState::Terminated);
        keep_alive::undefer(self.process_deferral);
        info!(
            "[CORTEX] ✅ '{}' decayed after {} impulses",
            self.name,
            self.counters.step
        );
        drop(signal);
    }

    /// Close synapses that were still queued for registration. Other queued messages are
    /// discarded.
    fn close_unregistered(&mut self) {
        let queued: Vec<Control> = self
            .held
            .drain(..)
            .chain(self.pending.drain(..))
            .chain(self.control.try_iter())
            .collect();
        let mut discarded = 0;
        for msg in queued {
            match msg {
                Control::SynapseAdded(synapse) => self.close_synapse(&synapse),
                Control::Spark(seeds) => seeds.iter().for_each(|s| self.close_synapse(s)),
                _ => discarded += 1,
            }
        }
        if discarded > 0 {
            debug!(
                "[CORTEX] '{}' discarding {} unprocessed control messages",
                self.name, discarded
            );
        }
    }

    fn close_synapse(&self, synapse: &Synapse) {
        debug!(
            "[CORTEX] '{}' closing unregistered synapse '{}'",
            self.name,
            synapse.name()
        );
        synapse.close(&Bridge::root(&*self.name).extend(synapse.name()));
    }
}
