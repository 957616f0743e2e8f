//! Core lookup cache with protected entries
//!
//! This module contains the [`LookupCache`] implementation: a capacity-bounded
//! map from lookup key to resolved value, persisted in full to the key-value
//! store after every mutation.
//!
//! An entry is *protected* once a resolution attempt has completed (`fetched`)
//! or a human has overridden it (`manually_set`). Automatic writes never
//! replace a protected entry, and protected entries do not expire. Capacity
//! eviction removes the oldest entries that are not manual overrides.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::store::JsonStore;
use crate::constants::store;

use super::config::CacheConfig;
use super::stats::CacheStats;

/// One cached lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Resolved value; `None` means the lookup resolved to nothing
    pub value: Option<String>,
    /// Time of the last write
    pub written_at: DateTime<Utc>,
    /// A human overrode the resolved value
    #[serde(default)]
    pub manually_set: bool,
    /// A resolution attempt has completed
    #[serde(default)]
    pub fetched: bool,
    /// Write order, used to break timestamp ties during eviction
    #[serde(skip)]
    sequence: u64,
}

impl CacheEntry {
    /// Protected entries ignore automatic writes and never expire
    pub fn is_protected(&self) -> bool {
        self.fetched || self.manually_set
    }

    fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        let Some(ttl) = ttl else {
            return false;
        };
        if self.is_protected() {
            return false;
        }
        match (now - self.written_at).to_std() {
            Ok(age) => age > ttl,
            Err(_) => false,
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_sequence: u64,
}

impl CacheState {
    fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    /// Drop unprotected entries past their TTL, returning how many went
    fn sweep_expired(&mut self, ttl: Option<Duration>, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(ttl, now));
        before - self.entries.len()
    }

    /// Evict the oldest non-manual entries until at most `capacity` remain
    fn evict_to_capacity(&mut self, capacity: usize) -> usize {
        if self.entries.len() <= capacity {
            return 0;
        }

        let mut candidates: Vec<(DateTime<Utc>, u64, String)> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.manually_set)
            .map(|(key, entry)| (entry.written_at, entry.sequence, key.clone()))
            .collect();
        candidates.sort();

        let excess = self.entries.len() - capacity;
        let mut evicted = 0;
        for (_, _, key) in candidates.into_iter().take(excess) {
            self.entries.remove(&key);
            evicted += 1;
        }

        if self.entries.len() > capacity {
            warn!(
                "Lookup cache holds {} manual overrides, above its capacity of {}",
                self.entries.len(),
                capacity
            );
        }

        evicted
    }
}

/// Bounded, persisted lookup cache
///
/// Construct once and share it (`Arc<LookupCache>`) with every consumer.
#[derive(Debug)]
pub struct LookupCache {
    config: CacheConfig,
    store: JsonStore,
    state: Mutex<CacheState>,
}

impl LookupCache {
    /// Create a cache, loading any entries persisted in `store`
    ///
    /// Entries already past their TTL are discarded while loading.
    pub fn new(config: CacheConfig, store: JsonStore) -> Self {
        let now = Utc::now();
        let stored: HashMap<String, CacheEntry> =
            store.load(store::COVER_CACHE_KEY).unwrap_or_default();
        let loaded = stored.len();

        let mut ordered: Vec<(String, CacheEntry)> = stored
            .into_iter()
            .filter(|(_, entry)| !entry.is_expired(config.ttl, now))
            .collect();
        ordered.sort_by(|a, b| a.1.written_at.cmp(&b.1.written_at).then(a.0.cmp(&b.0)));

        let mut state = CacheState::default();
        for (key, mut entry) in ordered {
            entry.sequence = state.next_sequence();
            state.entries.insert(key, entry);
        }
        state.evict_to_capacity(config.capacity);

        info!(
            "Initialized lookup cache with {} entries ({} discarded)",
            state.entries.len(),
            loaded - state.entries.len()
        );

        Self {
            config,
            store,
            state: Mutex::new(state),
        }
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Read the cached value for `key`
    ///
    /// Never triggers a resolution. Returns `None` both for unknown keys and
    /// for keys that resolved to nothing; use [`LookupCache::entry`] to tell
    /// them apart.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entry(key).and_then(|entry| entry.value)
    }

    /// Read the full entry for `key`, expiring it if its TTL has passed
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        let mut state = self.state.lock();
        let expired = match state.entries.get(key) {
            Some(entry) => entry.is_expired(self.config.ttl, Utc::now()),
            None => return None,
        };

        if expired {
            state.entries.remove(key);
            debug!("Expired lookup cache entry: {}", key);
            self.persist(&state);
            return None;
        }

        state.entries.get(key).cloned()
    }

    /// Write a value for `key`
    ///
    /// A non-manual write to a protected entry is dropped. A manual write
    /// always replaces the entry and marks it fetched.
    ///
    /// # Returns
    ///
    /// Whether the write was applied
    pub fn set(&self, key: &str, value: Option<String>, manual: bool) -> bool {
        let mut state = self.state.lock();

        if !manual {
            if let Some(existing) = state.entries.get(key) {
                if existing.is_protected() {
                    debug!("Dropped automatic write to protected entry: {}", key);
                    return false;
                }
            }
        }

        let sequence = state.next_sequence();
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                written_at: Utc::now(),
                manually_set: manual,
                fetched: manual,
                sequence,
            },
        );

        self.enforce_bounds(&mut state);
        self.persist(&state);
        true
    }

    /// Record that a resolution attempt for `key` has completed
    ///
    /// Unknown keys get a negative entry so the attempt is not repeated.
    pub fn mark_fetched(&self, key: &str) {
        let mut state = self.state.lock();

        if let Some(entry) = state.entries.get_mut(key) {
            entry.fetched = true;
        } else {
            let sequence = state.next_sequence();
            state.entries.insert(
                key.to_string(),
                CacheEntry {
                    value: None,
                    written_at: Utc::now(),
                    manually_set: false,
                    fetched: true,
                    sequence,
                },
            );
            self.enforce_bounds(&mut state);
        }

        self.persist(&state);
    }

    /// Whether a human has overridden `key`
    pub fn is_manually_set(&self, key: &str) -> bool {
        self.state
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.manually_set)
            .unwrap_or(false)
    }

    /// Whether a resolution attempt for `key` has completed
    pub fn has_been_fetched(&self, key: &str) -> bool {
        self.state
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.fetched)
            .unwrap_or(false)
    }

    /// Drop every entry, including manual overrides
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        if let Err(e) = self.store.remove(store::COVER_CACHE_KEY) {
            warn!("Failed to remove persisted lookup cache: {}", e);
        }
        info!("Cleared lookup cache");
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current cache statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let mut stats = CacheStats {
            entries: state.entries.len(),
            capacity: self.config.capacity,
            ..Default::default()
        };
        for entry in state.entries.values() {
            if entry.manually_set {
                stats.manual += 1;
            }
            if entry.fetched {
                stats.fetched += 1;
            }
            if entry.value.is_none() {
                stats.negative += 1;
            }
        }
        stats
    }

    fn enforce_bounds(&self, state: &mut CacheState) {
        let expired = state.sweep_expired(self.config.ttl, Utc::now());
        let evicted = state.evict_to_capacity(self.config.capacity);
        if expired > 0 || evicted > 0 {
            debug!(
                "Lookup cache bounded: {} expired, {} evicted, {} remain",
                expired,
                evicted,
                state.entries.len()
            );
        }
    }

    fn persist(&self, state: &CacheState) {
        if let Err(e) = self.store.save(store::COVER_CACHE_KEY, &state.entries) {
            warn!("Failed to persist lookup cache: {}", e);
        }
    }
}
