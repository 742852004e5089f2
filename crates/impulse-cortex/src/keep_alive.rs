// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Process-level liveness and shutdown hooks.
//!
//! Every cortex registers one deferral here when it is created and removes it when it decays.
//! On termination the alive flag drops (cortex loops stop firing), an optional grace delay
//! elapses, then all registered deferrals run concurrently and the caller is released once
//! each has signalled.

use crate::control::Deferral;
use crate::diagnostic::panic_message;
#[cfg(feature = "termination")]
use crate::error::CortexResult;
use ahash::AHashMap;
use crossbeam::channel::Receiver;
use crossbeam::sync::WaitGroup;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

static ALIVE: AtomicBool = AtomicBool::new(true);

static DEFERRALS: Lazy<Mutex<AHashMap<Uuid, Deferral>>> =
    Lazy::new(|| Mutex::new(AHashMap::new()));

/// `false` once process termination has begun.
pub fn alive() -> bool {
    ALIVE.load(Ordering::Acquire)
}

/// Number of process shutdown hooks currently registered.
pub fn deferrals() -> usize {
    DEFERRALS.lock().len()
}

/// Register a process shutdown hook. The returned id removes it again via [`undefer`].
pub fn defer<F>(deferral: F) -> Uuid
where
    F: FnOnce(WaitGroup) + Send + 'static,
{
    let id = Uuid::now_v7();
    DEFERRALS.lock().insert(id, Box::new(deferral));
    id
}

/// Drop a registered hook without running it. Returns `false` if it was already taken.
pub fn undefer(id: Uuid) -> bool {
    DEFERRALS.lock().remove(&id).is_some()
}

/// Block until SIGINT or SIGTERM, then shut the process's cortices down.
///
/// Only one signal handler can be installed per process.
#[cfg(feature = "termination")]
pub fn keep_alive(post_delay: Option<Duration>) -> CortexResult<()> {
    let (tx, rx) = crossbeam::channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })?;
    info!("[KEEP-ALIVE] Waiting for termination signal");
    keep_alive_until(rx, post_delay);
    Ok(())
}

/// Like [`keep_alive`], but triggered by a message (or disconnect) on `trigger`.
pub fn keep_alive_until(trigger: Receiver<()>, post_delay: Option<Duration>) {
    let _ = trigger.recv();
    shutdown(post_delay);
}

fn shutdown(post_delay: Option<Duration>) {
    ALIVE.store(false, Ordering::Release);
    info!("[KEEP-ALIVE] Termination requested, shutting down");

    if let Some(delay) = post_delay {
        thread::sleep(delay);
    }

    // Taken out before running: a decaying cortex calls `undefer` from its own thread.
    let registered = std::mem::take(&mut *DEFERRALS.lock());
    let group = WaitGroup::new();
    let mut workers = Vec::new();
    for (idx, deferral) in registered.into_values().enumerate() {
        let member = group.clone();
        let spawned = thread::Builder::new()
            .name(format!("deferral-{}", idx))
            .spawn(move || {
                if let Err(payload) = catch_unwind(AssertUnwindSafe(move || deferral(member))) {
                    warn!(
                        "[KEEP-ALIVE] ⚠️ Deferral {} panicked: {}",
                        idx,
                        panic_message(payload.as_ref())
                    );
                }
            });
        match spawned {
            Ok(handle) => workers.push(handle),
            Err(e) => warn!("[KEEP-ALIVE] ⚠️ Failed to spawn deferral {}: {}", idx, e),
        }
    }

    let count = workers.len();
    group.wait();
    for handle in workers {
        let _ = handle.join();
    }
    info!("[KEEP-ALIVE] ✅ {} deferrals completed", count);
}
