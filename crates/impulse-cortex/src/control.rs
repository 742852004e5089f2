// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Control messages and the cloneable handle that delivers them to a cortex.
//!
//! Every state change of a cortex travels through one bounded channel, so its coordinator
//! thread is the only owner of the synapse set and the counters.

use crate::error::{CortexError, CortexResult};
use crate::synapse::Synapse;
use crossbeam::channel::{Sender, TrySendError};
use crossbeam::sync::WaitGroup;
use std::fmt;
use std::sync::Arc;

/// Shutdown hook. Receives a wait-group member and drops it once finished.
pub type Deferral = Box<dyn FnOnce(WaitGroup) + Send + 'static>;

pub enum Control {
    /// Start the cortex with an initial set of synapses.
    Spark(Vec<Synapse>),
    Mute,
    Unmute,
    SynapseAdded(Synapse),
    /// Run deferrals, close synapses and stop. The wait group is released at the end.
    Decay(Option<WaitGroup>),
    /// Fire one impulse immediately.
    Impulse,
    /// Register a shutdown hook. Never held.
    Defer(Deferral),
}

impl Control {
    pub fn kind(&self) -> &'static str {
        match self {
            Control::Spark(_) => "spark",
            Control::Mute => "mute",
            Control::Unmute => "unmute",
            Control::SynapseAdded(_) => "synapse-added",
            Control::Decay(_) => "decay",
            Control::Impulse => "impulse",
            Control::Defer(_) => "defer",
        }
    }
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::Spark(seeds) => f
                .debug_tuple("Spark")
                .field(&seeds.iter().map(Synapse::name).collect::<Vec<_>>())
                .finish(),
            Control::SynapseAdded(synapse) => {
                f.debug_tuple("SynapseAdded").field(&synapse.name()).finish()
            }
            other => f.write_str(other.kind()),
        }
    }
}

/// Cloneable sender side of a cortex's control channel.
#[derive(Clone)]
pub struct CortexHandle {
    name: Arc<str>,
    tx: Sender<Control>,
}

impl CortexHandle {
    pub(crate) fn new(name: Arc<str>, tx: Sender<Control>) -> Self {
        Self { name, tx }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a message, blocking while the channel is full.
    pub fn send(&self, msg: Control) -> CortexResult<()> {
        self.tx
            .send(msg)
            .map_err(|_| CortexError::Terminated(self.name.to_string()))
    }

    /// Enqueue without blocking. Returns the message when the channel is full.
    pub fn try_send(&self, msg: Control) -> Result<(), Control> {
        match self.tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(msg)) | Err(TrySendError::Disconnected(msg)) => Err(msg),
        }
    }

    pub fn spark(&self, synapses: Vec<Synapse>) -> CortexResult<()> {
        self.send(Control::Spark(synapses))
    }

    pub fn mute(&self) -> CortexResult<()> {
        self.send(Control::Mute)
    }

    pub fn unmute(&self) -> CortexResult<()> {
        self.send(Control::Unmute)
    }

    pub fn add_synapse(&self, synapse: Synapse) -> CortexResult<()> {
        self.send(Control::SynapseAdded(synapse))
    }

    pub fn impulse(&self) -> CortexResult<()> {
        self.send(Control::Impulse)
    }

    pub fn defer<F>(&self, deferral: F) -> CortexResult<()>
    where
        F: FnOnce(WaitGroup) + Send + 'static,
    {
        self.send(Control::Defer(Box::new(deferral)))
    }

    /// Request decay and block until the coordinator has finished tearing down.
    ///
    /// Follows the normal holding rules, so a muted cortex only completes this after unmute.
    /// Must not be called from an action of the same cortex.
    pub fn decay_and_wait(&self) -> CortexResult<()> {
        let group = WaitGroup::new();
        self.send(Control::Decay(Some(group.clone())))?;
        group.wait();
        Ok(())
    }

    /// Messages waiting in the channel.
    pub fn queued(&self) -> usize {
        self.tx.len()
    }
}

impl fmt::Debug for CortexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CortexHandle")
            .field("name", &self.name)
            .field("queued", &self.tx.len())
            .finish()
    }
}
