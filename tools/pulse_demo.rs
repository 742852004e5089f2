// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pulse demo - runs a configured cortex until SIGINT/SIGTERM or a fixed duration.

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use impulse::config::{
    apply_cli_overrides, apply_environment_overrides, load_config, validate_config, ConfigError,
    ImpulseConfig,
};
use impulse::observability::{debug_flags_help, init_logging, CrateDebugFlags, DEBUG_ENV};
use impulse::prelude::*;
use impulse::settings::{cluster_frequency, cortex_settings, logging_config};

/// Impulse pulse demo - a heartbeat, a one-shot warmup and a two-neuron cluster
#[derive(Parser, Debug)]
#[command(name = "pulse_demo", version, author, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Path to impulse.toml (searched for when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cortex frequency in Hz
    #[arg(long)]
    frequency_hz: Option<f64>,

    /// Fixed beats per cycle
    #[arg(long)]
    phase: Option<u64>,

    /// Cluster relay frequency in Hz
    #[arg(long)]
    sub_frequency_hz: Option<f64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Stop after this many seconds instead of waiting for a signal
    #[arg(long)]
    duration_secs: Option<u64>,
}

impl Args {
    fn overrides(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(hz) = self.frequency_hz {
            map.insert("frequency_hz".to_string(), hz.to_string());
        }
        if let Some(phase) = self.phase {
            map.insert("phase".to_string(), phase.to_string());
        }
        if let Some(hz) = self.sub_frequency_hz {
            map.insert("sub_frequency_hz".to_string(), hz.to_string());
        }
        if let Some(level) = &self.log_level {
            map.insert("log_level".to_string(), level.clone());
        }
        map
    }
}

/// Load `impulse.toml`, falling back to defaults when none exists and no path was given.
fn resolve_config(args: &Args) -> Result<(ImpulseConfig, bool)> {
    let overrides = args.overrides();
    match load_config(args.config.as_deref(), Some(&overrides)) {
        Ok(config) => Ok((config, false)),
        Err(ConfigError::FileNotFound(_)) if args.config.is_none() => {
            let mut config = ImpulseConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &overrides);
            validate_config(&config)?;
            Ok((config, true))
        }
        Err(e) => Err(e).context("Failed to load configuration"),
    }
}

fn main() -> Result<()> {
    // `--debug-<crate>` flags are not clap arguments
    let (debug_args, clap_args): (Vec<String>, Vec<String>) =
        std::env::args().partition(|arg| arg.starts_with("--debug-"));
    let args = Args::parse_from(clap_args);
    let mut debug_flags = CrateDebugFlags::from_args(debug_args);
    if let Ok(value) = std::env::var(DEBUG_ENV) {
        debug_flags.merge_env_value(&value);
    }

    let (config, defaulted) = resolve_config(&args)?;
    let _logging = init_logging(&logging_config(&config), &debug_flags)?;
    if defaulted {
        info!("[PULSE-DEMO] No impulse.toml found, using defaults");
    }

    let (frequency, settings) = cortex_settings(&config);
    let cortex = Cortex::with_config(config.cortex.name.as_str(), frequency, settings)?;
    info!(
        "[PULSE-DEMO] ✅ Cortex '{}' at {:.1} Hz",
        cortex.name(),
        cortex.frequency().get()
    );

    let heartbeat = Synapse::new(Lifecycle::Looping, "heartbeat", |impulse| {
        if impulse.step() % 100 == 0 {
            info!(
                "[PULSE-DEMO] 💓 step={} cycle={} beat={}",
                impulse.step(),
                impulse.cycle(),
                impulse.beat()
            );
        }
    });
    let warmup = Synapse::new(Lifecycle::Triggered, "warmup", |impulse| {
        info!("[PULSE-DEMO] Warmup fired at step {}", impulse.step());
    })
    .with_potential(|impulse| impulse.step() >= 10);

    let neurons = ["left", "right"].map(|side| {
        Synapse::new(Lifecycle::Looping, side, move |impulse| {
            debug!("[PULSE-DEMO] {} relayed via {}", side, impulse.bridge());
        })
    });
    let probes: Vec<SynapseProbe> = [&heartbeat, &warmup]
        .into_iter()
        .chain(neurons.iter())
        .map(Synapse::probe)
        .collect();
    let cluster = Cluster::new("limbs", cluster_frequency(&config)).with_neurons(neurons);

    cortex.spark(vec![heartbeat, warmup, cluster.into_synapse()])?;

    let post_delay = config.keep_alive.post_delay();
    match args.duration_secs {
        Some(secs) => {
            let (trigger, signal) = crossbeam::channel::bounded(1);
            thread::Builder::new()
                .name("pulse-demo-timer".to_string())
                .spawn(move || {
                    thread::sleep(Duration::from_secs(secs));
                    let _ = trigger.send(());
                })?;
            keep_alive::keep_alive_until(signal, post_delay);
        }
        None => keep_alive::keep_alive(post_delay)?,
    }

    for probe in &probes {
        info!(
            "[PULSE-DEMO] {} activations={} missed={}",
            probe.name(),
            probe.recorded(),
            probe.missed()
        );
    }
    Ok(())
}
