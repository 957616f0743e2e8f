//! Snapshot persistence for synchronization passes
//!
//! Partial writes during a pass are debounced: each schedule replaces the
//! pending write and restarts its timer. The final write of a pass is
//! synchronous and cancels whatever is still pending.
//!
//! Aborting a task cannot stop a store write that is already running, so
//! every scheduled write carries a generation ticket. A write only lands while
//! its ticket is current, and the check and the write happen under one lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::app::models::Snapshot;
use crate::app::store::JsonStore;
use crate::constants::store;
use crate::errors::{StoreError, StoreResult};

/// Orders partial writes against newer schedules and the final write
#[derive(Debug, Default)]
struct WriteGate {
    generation: Mutex<u64>,
}

impl WriteGate {
    /// Ticket for a new write; every older ticket becomes stale
    fn issue(&self) -> u64 {
        let mut generation = self.generation.lock();
        *generation += 1;
        *generation
    }

    /// Make every issued ticket stale, waiting for a running write to finish
    fn invalidate(&self) {
        *self.generation.lock() += 1;
    }

    /// Run `write_partial` if `ticket` is still current
    fn write_if_current(
        &self,
        ticket: u64,
        store: &JsonStore,
        partial: &Snapshot,
    ) -> StoreResult<bool> {
        let generation = self.generation.lock();
        if *generation != ticket {
            return Ok(false);
        }
        write_partial(store, partial)?;
        Ok(true)
    }
}

/// Re-armable, cancelable delayed snapshot write
#[derive(Debug)]
pub struct DebouncedPersister {
    store: JsonStore,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    gate: Arc<WriteGate>,
}

impl DebouncedPersister {
    pub fn new(store: JsonStore, delay: Duration) -> Self {
        Self {
            store,
            delay,
            pending: Mutex::new(None),
            gate: Arc::new(WriteGate::default()),
        }
    }

    /// Write `snapshot` once no newer schedule arrives for the debounce delay
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, snapshot: Snapshot) {
        let store = self.store.clone();
        let delay = self.delay;
        let gate = Arc::clone(&self.gate);
        let ticket = gate.issue();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match gate.write_if_current(ticket, &store, &snapshot) {
                Ok(true) => {}
                Ok(false) => debug!("Skipped superseded partial snapshot write"),
                Err(e) => warn!("Partial snapshot write failed: {}", e),
            }
        });

        if let Some(previous) = self.pending.lock().replace(task) {
            previous.abort();
        }
    }

    /// Drop the pending write, if any
    ///
    /// Blocks while a partial write is in progress, so a write issued after
    /// this returns is never overwritten by an older partial.
    pub fn cancel(&self) {
        if let Some(task) = self.pending.lock().take() {
            task.abort();
            debug!("Cancelled pending partial snapshot write");
        }
        self.gate.invalidate();
    }

    /// Whether a write is scheduled and has not yet run
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for DebouncedPersister {
    fn drop(&mut self) {
        if let Some(task) = self.pending.get_mut().take() {
            task.abort();
        }
        self.gate.invalidate();
    }
}

/// Merge `partial` into the stored snapshot and write the result
///
/// The stored snapshot is re-read first so records written by other writers
/// survive. A stored profile is kept when the partial carries none.
pub fn write_partial(store: &JsonStore, partial: &Snapshot) -> StoreResult<()> {
    let mut merged: Snapshot = store.load(store::SNAPSHOT_KEY).unwrap_or_default();
    merged.merge_records(&partial.records);
    merged.dedup();
    if partial.profile.is_some() {
        merged.profile = partial.profile.clone();
    }
    merged.updated_at = Some(Utc::now());

    store
        .save(store::SNAPSHOT_KEY, &merged)
        .map_err(persist_failure)?;
    debug!("Partial snapshot written ({} records)", merged.len());
    Ok(())
}

/// Replace the stored snapshot with `snapshot`
pub fn write_final(store: &JsonStore, snapshot: &Snapshot) -> StoreResult<()> {
    store
        .save(store::SNAPSHOT_KEY, snapshot)
        .map_err(persist_failure)?;
    debug!("Final snapshot written ({} records)", snapshot.len());
    Ok(())
}

fn persist_failure(error: StoreError) -> StoreError {
    StoreError::PersistFailure {
        namespace: store::SNAPSHOT_KEY.to_string(),
        reason: error.to_string(),
    }
}
