//! Snapshot change subscribers
//!
//! Callbacks are invoked outside the registry lock, so a callback may
//! subscribe or unsubscribe (itself included) while it runs. A panicking
//! callback is logged and skipped.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::warn;

use crate::app::models::Snapshot;

/// Callback receiving the full working snapshot
pub type SnapshotCallback = dyn Fn(&Snapshot) + Send + Sync;

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: Vec<(u64, Arc<SnapshotCallback>)>,
}

/// Set of registered snapshot callbacks
#[derive(Clone, Default)]
pub struct Subscribers {
    registry: Arc<Mutex<Registry>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`; it stays registered until unsubscribed
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.push((id, Arc::new(callback)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `snapshot` to every current subscriber, in subscription order
    pub fn notify(&self, snapshot: &Snapshot) {
        let callbacks: Vec<Arc<SnapshotCallback>> = self
            .registry
            .lock()
            .callbacks
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(snapshot))).is_err() {
                warn!("Snapshot subscriber panicked; continuing");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.registry.lock().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.len())
            .finish()
    }
}

/// Handle returned by [`Subscribers::subscribe`]
///
/// Dropping the handle does not unsubscribe.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the callback; calling again is a no-op
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .callbacks
                .retain(|(id, _)| *id != self.id);
        }
    }
}
