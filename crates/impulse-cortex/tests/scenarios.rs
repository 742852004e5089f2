// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # End-to-end Scheduling Scenarios
//!
//! Wall-clock scenarios covering fixed-rate looping, phase mode, mute/unmute ordering,
//! stimulative concurrency, cluster sub-rotation and deferral draining.

use impulse_cortex::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn config_with_timeline(capacity: usize) -> CortexConfig {
    CortexConfig {
        timeline_capacity: capacity,
        ..CortexConfig::default()
    }
}

fn assert_well_ordered(probe: &SynapseProbe) {
    let snapshot = probe.timeline().snapshot();
    for record in &snapshot {
        assert!(record.activated >= record.inception);
        assert!(record.completed >= record.activated);
    }
    for pair in snapshot.windows(2) {
        assert!(pair[0].inception <= pair[1].inception);
        assert!(pair[0].counters.step < pair[1].counters.step);
    }
}

#[test]
fn test_fixed_rate_looping() {
    let mut cortex = Cortex::with_config("C", 100.0, config_with_timeline(256)).unwrap();
    let counter = Arc::new(Mutex::new(0u64));
    let shared = Arc::clone(&counter);
    let synapse = Synapse::new(Lifecycle::Looping, "count", move |_| {
        *shared.lock() += 1;
    });
    let probe = synapse.probe();

    cortex.spark(vec![synapse]).unwrap();
    thread::sleep(Duration::from_millis(1000));
    cortex.decay().unwrap();

    let count = *counter.lock();
    assert!((95..=105).contains(&count), "count = {}", count);
    assert_eq!(probe.timeline().len() as u64, count);
    for period in probe.timeline().cycle_periods() {
        assert!(
            period >= Duration::from_millis(5) && period <= Duration::from_millis(15),
            "cycle period {:?}",
            period
        );
    }
    assert_well_ordered(&probe);
}

#[test]
fn test_phase_mode_three_synapses() {
    let config = CortexConfig {
        phase: Some(3),
        timeline_capacity: 64,
        ..CortexConfig::default()
    };
    let mut cortex = Cortex::with_config("phased", 30.0, config).unwrap();
    let synapses: Vec<Synapse> = ["A", "B", "C"]
        .iter()
        .enumerate()
        .map(|(beat, name)| {
            Synapse::new(Lifecycle::Looping, *name, |_| {})
                .with_potential(potential::on_beat(beat as u64))
        })
        .collect();
    let probes: Vec<SynapseProbe> = synapses.iter().map(Synapse::probe).collect();

    cortex.spark(synapses).unwrap();
    thread::sleep(Duration::from_millis(1000));
    cortex.decay().unwrap();

    for probe in &probes {
        let recorded = probe.recorded();
        assert!((8..=12).contains(&recorded), "{} recorded {}", probe.name(), recorded);
        assert_well_ordered(probe);
    }

    let steps_by_cycle = |probe: &SynapseProbe| -> Vec<(u64, u64)> {
        probe
            .timeline()
            .snapshot()
            .iter()
            .map(|a| (a.counters.cycle, a.counters.step))
            .collect()
    };
    let (a, b, c) = (
        steps_by_cycle(&probes[0]),
        steps_by_cycle(&probes[1]),
        steps_by_cycle(&probes[2]),
    );
    for (cycle, step_a) in &a {
        let step_b = b.iter().find(|(cb, _)| cb == cycle).map(|(_, s)| *s);
        let step_c = c.iter().find(|(cc, _)| cc == cycle).map(|(_, s)| *s);
        if let (Some(step_b), Some(step_c)) = (step_b, step_c) {
            assert!(*step_a < step_b && step_b < step_c, "cycle {}", cycle);
        }
    }
}

#[test]
fn test_mute_unmute_preserves_order() {
    let mut cortex = Cortex::with_config("muted", 50.0, config_with_timeline(128)).unwrap();
    let steps = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&steps);
    let first = Synapse::new(Lifecycle::Looping, "first", move |impulse| {
        log.lock().push(impulse.step());
    });
    let first_probe = first.probe();
    let second = Synapse::new(Lifecycle::Looping, "S2", |_| {});
    let second_probe = second.probe();

    let start = Instant::now();
    cortex.spark(vec![first]).unwrap();

    thread::sleep(Duration::from_millis(100).saturating_sub(start.elapsed()));
    cortex.mute().unwrap();
    let muted_at = Instant::now();

    thread::sleep(Duration::from_millis(200).saturating_sub(start.elapsed()));
    cortex.add_synapse(second).unwrap();

    thread::sleep(Duration::from_millis(300).saturating_sub(start.elapsed()));
    let held_before_unmute = cortex.stats().held();
    let unmuted_at = Instant::now();
    cortex.unmute().unwrap();

    thread::sleep(Duration::from_millis(300));
    cortex.decay().unwrap();

    assert_eq!(held_before_unmute, 1);
    let quiet_from = muted_at + Duration::from_millis(25);
    assert!(first_probe
        .timeline()
        .snapshot()
        .iter()
        .all(|a| a.inception < quiet_from || a.inception >= unmuted_at));

    let steps = steps.lock().clone();
    assert!(steps.windows(2).all(|w| w[0] < w[1]));
    let inceptions: Vec<Instant> = first_probe
        .timeline()
        .snapshot()
        .iter()
        .map(|a| a.inception)
        .collect();
    let long_gaps = inceptions
        .windows(2)
        .filter(|w| w[1] - w[0] >= Duration::from_millis(100))
        .count();
    assert_eq!(long_gaps, 1);

    assert!(first_probe
        .timeline()
        .snapshot()
        .iter()
        .any(|a| a.inception >= unmuted_at));
    assert!(second_probe.recorded() > 0);
    assert_well_ordered(&first_probe);
}

#[test]
fn test_stimulative_concurrency() {
    let mut cortex = Cortex::with_config("stim", 100.0, config_with_timeline(128)).unwrap();
    let synapse = Synapse::new(Lifecycle::Stimulative, "sleepy", |_| {
        thread::sleep(Duration::from_millis(50));
    });
    let probe = synapse.probe();

    cortex.spark(vec![synapse]).unwrap();
    let mut max_in_flight = 0;
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(500) {
        max_in_flight = max_in_flight.max(probe.in_flight());
        thread::sleep(Duration::from_millis(3));
    }
    cortex.decay().unwrap();
    thread::sleep(Duration::from_millis(80));

    assert!(probe.recorded() >= 30, "recorded {}", probe.recorded());
    assert!((3..=7).contains(&max_in_flight), "max in flight {}", max_in_flight);
}

#[test]
fn test_cluster_sub_rotation() {
    let mut cortex = Cortex::new("parent", 60.0).unwrap();
    let retire_n2 = Arc::new(AtomicBool::new(false));

    let mut neurons = Vec::new();
    for idx in 1..=3 {
        let retire = Arc::clone(&retire_n2);
        neurons.push(
            Synapse::new(Lifecycle::Looping, format!("N{}", idx), move |impulse| {
                if idx == 2 && retire.load(Ordering::Acquire) {
                    impulse.decay();
                }
            })
            .with_timeline_capacity(64),
        );
    }
    let probes: Vec<SynapseProbe> = neurons.iter().map(Synapse::probe).collect();
    let cluster = Cluster::new("cluster", 60.0).with_neurons(neurons);
    let handle = cluster.handle();

    cortex.spark(vec![cluster.into_synapse()]).unwrap();
    thread::sleep(Duration::from_millis(500));

    let n4 = Synapse::new(Lifecycle::Looping, "N4", |_| {}).with_timeline_capacity(64);
    let n4_probe = n4.probe();
    handle.add(n4).unwrap();
    retire_n2.store(true, Ordering::Release);

    thread::sleep(Duration::from_millis(500));
    cortex.decay().unwrap();

    let near = |value: u64, target: u64| value + 5 >= target && value <= target + 5;
    assert!(near(probes[0].recorded(), 20), "N1 {}", probes[0].recorded());
    assert!(near(probes[2].recorded(), 20), "N3 {}", probes[2].recorded());
    assert!(near(probes[1].recorded(), 10), "N2 {}", probes[1].recorded());
    assert!(near(n4_probe.recorded(), 10), "N4 {}", n4_probe.recorded());
    assert!(probes[1].is_decayed());

    let bridge = n4_probe.timeline().latest().unwrap().bridge;
    assert_eq!(bridge.to_string(), "parent → cluster → N4");
}

#[test]
fn test_decay_drains_deferrals() {
    let cortex = Cortex::new("drain", 100.0).unwrap();
    let activated = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&activated);
    let synapse = Synapse::new(Lifecycle::Looping, "s", move |_| {
        log.lock().push(Instant::now());
    });

    let deferral_started = Arc::new(Mutex::new(None));
    let started = Arc::clone(&deferral_started);
    cortex
        .defer(move |member| {
            *started.lock() = Some(Instant::now());
            thread::sleep(Duration::from_millis(50));
            drop(member);
        })
        .unwrap();

    let handle = cortex.handle();
    let begin = Instant::now();
    cortex.spark(vec![synapse]).unwrap();
    let group = WaitGroup::new();
    handle.send(Control::Decay(Some(group.clone()))).unwrap();
    group.wait();
    let elapsed = begin.elapsed();

    assert!(
        elapsed >= Duration::from_millis(50) && elapsed < Duration::from_millis(100),
        "decay took {:?}",
        elapsed
    );
    assert_eq!(cortex.state(), CortexState::Terminated);
    let started = deferral_started.lock().unwrap();
    assert!(activated.lock().iter().all(|at| *at < started));

    let count = activated.lock().len();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(activated.lock().len(), count);
}
