//! Synchronization engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::retry::RetryPolicy;
use crate::constants::sync;

/// Tuning for a synchronization pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Detail fetches issued concurrently per batch
    pub detail_batch_size: usize,
    /// Pause between detail batches
    #[serde(with = "humantime_serde")]
    pub batch_pause: Duration,
    /// Retry schedule for a single detail fetch
    pub detail_retry: RetryPolicy,
    /// Quiet period before a partial snapshot write
    #[serde(with = "humantime_serde")]
    pub persist_debounce: Duration,
    /// Consecutive unchanged pages that end a refresh pass
    pub unchanged_page_limit: u32,
    /// Age after which a cached snapshot triggers a background refresh
    #[serde(with = "humantime_serde")]
    pub stale_after: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            detail_batch_size: sync::DETAIL_BATCH_SIZE,
            batch_pause: sync::BATCH_PAUSE,
            detail_retry: RetryPolicy::default(),
            persist_debounce: sync::PERSIST_DEBOUNCE,
            unchanged_page_limit: sync::UNCHANGED_PAGE_LIMIT,
            stale_after: sync::STALE_AFTER,
        }
    }
}

impl SyncConfig {
    pub fn with_batch_size(mut self, detail_batch_size: usize) -> Self {
        self.detail_batch_size = detail_batch_size;
        self
    }

    pub fn with_batch_pause(mut self, batch_pause: Duration) -> Self {
        self.batch_pause = batch_pause;
        self
    }

    pub fn with_detail_retry(mut self, detail_retry: RetryPolicy) -> Self {
        self.detail_retry = detail_retry;
        self
    }

    pub fn with_persist_debounce(mut self, persist_debounce: Duration) -> Self {
        self.persist_debounce = persist_debounce;
        self
    }

    pub fn with_unchanged_page_limit(mut self, unchanged_page_limit: u32) -> Self {
        self.unchanged_page_limit = unchanged_page_limit;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.detail_batch_size == 0 {
            return Err("Detail batch size must be greater than 0".to_string());
        }
        if self.unchanged_page_limit == 0 {
            return Err("Unchanged page limit must be greater than 0".to_string());
        }
        self.detail_retry.validate()
    }
}
