// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Clusters
//!
//! A cluster is a looping synapse that owns a ring of nested synapses ("neurons"). Each
//! impulse the cluster accepts is relayed to the next neuron, which treats it exactly like a
//! synapse under a cortex would: same lifecycles, potentials, decay and cleanup.
//!
//! The relay rate follows a sympathetic sub-frequency derived from the parent's frequency:
//! at a sub-frequency of 20 Hz under a 60 Hz cortex every third impulse is relayed.

use crate::activation::{Bridge, Impulse};
use crate::error::{CortexError, CortexResult};
use crate::frequency::FrequencyRef;
use crate::synapse::{Feedback, Lifecycle, Synapse};
use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

// Keeps ratios like 1/3 from losing a relay to rounding.
const CREDIT_EPSILON: f64 = 1e-9;

pub struct Cluster {
    name: Arc<str>,
    sub_frequency: FrequencyRef,
    neurons: VecDeque<Synapse>,
    additions_tx: Sender<Synapse>,
    additions_rx: Receiver<Synapse>,
    feedback_tx: Sender<Feedback>,
    feedback_rx: Receiver<Feedback>,
    credit: f64,
    count: Arc<AtomicUsize>,
}

/// Adds neurons to a cluster that may already be running under a cortex.
#[derive(Debug, Clone)]
pub struct ClusterHandle {
    name: Arc<str>,
    tx: Sender<Synapse>,
    count: Arc<AtomicUsize>,
}

impl ClusterHandle {
    /// Queue a neuron. It joins the ring on the cluster's next impulse.
    pub fn add(&self, neuron: Synapse) -> CortexResult<()> {
        self.tx
            .send(neuron)
            .map_err(|_| CortexError::Terminated(self.name.to_string()))
    }

    /// Neurons in the ring as of the last impulse.
    pub fn neurons(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

impl Cluster {
    /// A sub-frequency of 0 relays every accepted impulse.
    pub fn new(name: impl Into<String>, sub_frequency: impl Into<FrequencyRef>) -> Self {
        let (additions_tx, additions_rx) = unbounded();
        let (feedback_tx, feedback_rx) = unbounded();
        Self {
            name: Arc::from(name.into()),
            sub_frequency: sub_frequency.into(),
            neurons: VecDeque::new(),
            additions_tx,
            additions_rx,
            feedback_tx,
            feedback_rx,
            credit: 0.0,
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_neuron(mut self, neuron: Synapse) -> Self {
        self.neurons.push_back(neuron);
        self.count.store(self.neurons.len(), Ordering::Release);
        self
    }

    pub fn with_neurons(self, neurons: impl IntoIterator<Item = Synapse>) -> Self {
        neurons.into_iter().fold(self, Cluster::with_neuron)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> ClusterHandle {
        ClusterHandle {
            name: Arc::clone(&self.name),
            tx: self.additions_tx.clone(),
            count: Arc::clone(&self.count),
        }
    }

    /// Wrap the cluster in a looping synapse for registration with a cortex or a parent cluster.
    pub fn into_synapse(self) -> Synapse {
        let name = Arc::clone(&self.name);
        let cluster = Arc::new(Mutex::new(self));
        let closing = Arc::clone(&cluster);
        Synapse::new(Lifecycle::Looping, &*name, move |impulse: &mut Impulse| {
            cluster.lock().pulse(impulse)
        })
        .with_cleanup(move || closing.lock().close())
    }

    fn pulse(&mut self, impulse: &Impulse) {
        self.absorb_additions();
        self.settle(None);
        if self.neurons.is_empty() || !self.due(impulse.frequency()) {
            return;
        }
        let Some(mut neuron) = self.neurons.pop_front() else {
            return;
        };
        let id = neuron.id();
        neuron.stimulate(impulse.relay(), &self.feedback_tx);
        if self.settle(Some(id)) {
            self.neurons.push_back(neuron);
        }
        self.count.store(self.neurons.len(), Ordering::Release);
    }

    fn absorb_additions(&mut self) {
        let before = self.neurons.len();
        self.neurons.extend(self.additions_rx.try_iter());
        if self.neurons.len() != before {
            debug!(
                "[CLUSTER] '{}' now has {} neurons",
                self.name,
                self.neurons.len()
            );
            self.count.store(self.neurons.len(), Ordering::Release);
        }
    }

    /// Drain neuron feedback. Returns whether the neuron currently out of the ring stays.
    fn settle(&mut self, out_of_ring: Option<Uuid>) -> bool {
        let mut keep = true;
        while let Ok(feedback) = self.feedback_rx.try_recv() {
            match feedback {
                Feedback::Recycle(_) => {}
                Feedback::Decayed(id) if Some(id) == out_of_ring => keep = false,
                // A stimulative neuron finishing after its impulse was relayed.
                Feedback::Decayed(id) => self.neurons.retain(|neuron| neuron.id() != id),
            }
        }
        keep
    }

    /// Whether this parent impulse should be relayed at the current sub-frequency.
    fn due(&mut self, parent_hz: f64) -> bool {
        let sub_hz = self.sub_frequency.get();
        if sub_hz <= 0.0 || parent_hz <= 0.0 {
            return true;
        }
        self.credit += sub_hz / parent_hz;
        if self.credit + CREDIT_EPSILON >= 1.0 {
            self.credit = (self.credit - 1.0).clamp(0.0, 1.0);
            true
        } else {
            false
        }
    }

    fn close(&mut self) {
        self.absorb_additions();
        let bridge = Bridge::root(&*self.name);
        for neuron in self.neurons.drain(..) {
            neuron.close(&bridge);
        }
        self.count.store(0, Ordering::Release);
        debug!("[CLUSTER] '{}' closed", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Counters;
    use std::time::{Duration, Instant};

    fn parent_impulse(cycle: u64, hz: f64) -> Impulse {
        let now = Instant::now();
        Impulse::issue(
            Bridge::root("cortex").extend("cluster"),
            now,
            now,
            Counters {
                step: cycle,
                beat: 0,
                cycle,
            },
            Some(Duration::from_secs(1)),
            hz,
            None,
        )
    }

    #[test]
    fn test_round_robin_across_neurons() {
        let neurons: Vec<Synapse> = (0..3)
            .map(|i| Synapse::new(Lifecycle::Looping, format!("n{}", i), |_| {}))
            .collect();
        let probes: Vec<_> = neurons.iter().map(Synapse::probe).collect();
        let mut cluster = Cluster::new("cluster", 60.0).with_neurons(neurons);

        for cycle in 0..9 {
            cluster.pulse(&parent_impulse(cycle, 60.0));
        }

        for probe in &probes {
            assert_eq!(probe.recorded(), 3);
        }
        let bridge = probes[1].timeline().latest().unwrap().bridge;
        assert_eq!(bridge.to_string(), "cortex → cluster → n1");
    }

    #[test]
    fn test_sub_frequency_thins_relays() {
        let neuron = Synapse::new(Lifecycle::Looping, "n", |_| {});
        let probe = neuron.probe();
        let mut cluster = Cluster::new("cluster", 20.0).with_neuron(neuron);

        for cycle in 0..30 {
            cluster.pulse(&parent_impulse(cycle, 60.0));
        }
        assert_eq!(probe.recorded(), 10);
    }

    #[test]
    fn test_triggered_neuron_leaves_ring() {
        let once = Synapse::new(Lifecycle::Triggered, "once", |_| {});
        let stays = Synapse::new(Lifecycle::Looping, "stays", |_| {});
        let (p_once, p_stays) = (once.probe(), stays.probe());
        let mut cluster = Cluster::new("cluster", 0.0).with_neurons([once, stays]);
        let handle = cluster.handle();

        for cycle in 0..4 {
            cluster.pulse(&parent_impulse(cycle, 10.0));
        }
        assert_eq!(p_once.recorded(), 1);
        assert_eq!(p_stays.recorded(), 3);
        assert_eq!(handle.neurons(), 1);
    }

    #[test]
    fn test_empty_cluster_is_noop_and_accepts_additions() {
        let mut cluster = Cluster::new("cluster", 0.0);
        let handle = cluster.handle();
        cluster.pulse(&parent_impulse(0, 10.0));
        assert_eq!(handle.neurons(), 0);

        let late = Synapse::new(Lifecycle::Looping, "late", |_| {});
        let probe = late.probe();
        handle.add(late).unwrap();
        cluster.pulse(&parent_impulse(1, 10.0));
        assert_eq!(probe.recorded(), 1);
        assert_eq!(handle.neurons(), 1);
    }

    #[test]
    fn test_close_cleans_up_remaining_neurons() {
        let cleaned = Arc::new(AtomicUsize::new(0));
        let neurons: Vec<Synapse> = (0..2)
            .map(|i| {
                let cleaned = Arc::clone(&cleaned);
                Synapse::new(Lifecycle::Looping, format!("n{}", i), |_| {}).with_cleanup(
                    move || {
                        cleaned.fetch_add(1, Ordering::SeqCst);
                    },
                )
            })
            .collect();
        let mut cluster = Cluster::new("cluster", 0.0).with_neurons(neurons);

        cluster.close();
        cluster.close();
        assert_eq!(cleaned.load(Ordering::SeqCst), 2);
    }
}
