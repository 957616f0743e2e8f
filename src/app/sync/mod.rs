//! Library synchronization engine
//!
//! The engine pages a [`ListingSource`], fetches record details from a
//! [`DetailSource`] in bounded concurrent batches, and merges them into a
//! working snapshot. Changed pages are announced to subscribers and persisted
//! with debounced partial writes; the finished snapshot is written once at
//! the end of the pass.
//!
//! A refresh stops after a run of pages with no changes, since the listing is
//! ordered by recent activity. An initial load walks every page.
//!
//! # Module Organization
//!
//! - [`config`] - Pass tuning and defaults
//! - [`merge`] - Identity-indexed working snapshot
//! - [`persist`] - Debounced partial writes and the final write
//! - [`report`] - Per-pass statistics
//! - [`subscribers`] - Snapshot change callbacks

pub mod config;
pub mod merge;
pub mod persist;
pub mod report;
pub mod subscribers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::app::models::{DetailedRecord, ListingPage, ListingRecord, Profile, Snapshot};
use crate::app::preferences::{GamePreferences, PreferenceOverlay};
use crate::app::retry::retry_with;
use crate::app::store::JsonStore;
use crate::constants::{store, sync as sync_constants};
use crate::errors::{FetchError, FetchResult, StoreResult, SyncError, SyncResult};

pub use config::SyncConfig;
pub use merge::{MergeOutcome, WorkingSnapshot};
pub use persist::DebouncedPersister;
pub use report::SyncReport;
pub use subscribers::{Subscribers, Subscription};

/// Paginated remote listing
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch 1-based page `page`
    async fn fetch_page(&self, page: u32) -> FetchResult<ListingPage>;

    /// Name of the profile being listed
    fn profile_name(&self) -> &str;
}

/// Per-record detail lookup
#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn fetch_detail(&self, record: &ListingRecord) -> FetchResult<DetailedRecord>;
}

/// Where the snapshot returned by [`SyncEngine::fetch_all`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Served from the store without a pass
    Cache,
    /// Produced by a synchronization pass
    Remote,
}

/// Result of [`SyncEngine::fetch_all`]
#[derive(Debug)]
pub struct FetchOutcome {
    pub snapshot: Snapshot,
    pub source: SnapshotSource,
    /// Handle of the background refresh started for a stale cached snapshot
    pub background_refresh: Option<JoinHandle<()>>,
}

/// Clears the in-flight flag when a pass ends, however it ends
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Incremental synchronizer for one remote library
pub struct SyncEngine {
    listing: Arc<dyn ListingSource>,
    details: Arc<dyn DetailSource>,
    store: JsonStore,
    preferences: PreferenceOverlay,
    config: SyncConfig,
    subscribers: Subscribers,
    in_flight: Arc<AtomicBool>,
    last_report: Mutex<Option<SyncReport>>,
    failures: broadcast::Sender<Arc<SyncError>>,
}

impl SyncEngine {
    pub fn new(
        listing: Arc<dyn ListingSource>,
        details: Arc<dyn DetailSource>,
        store: JsonStore,
        config: SyncConfig,
    ) -> Self {
        let (failures, _) = broadcast::channel(sync_constants::FAILURE_CHANNEL_CAPACITY);
        Self {
            listing,
            details,
            preferences: PreferenceOverlay::new(store.clone()),
            store,
            config,
            subscribers: Subscribers::new(),
            in_flight: Arc::new(AtomicBool::new(false)),
            last_report: Mutex::new(None),
            failures,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Register a callback for working-snapshot updates
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Receive errors from background refreshes
    pub fn background_failures(&self) -> broadcast::Receiver<Arc<SyncError>> {
        self.failures.subscribe()
    }

    /// Whether a pass is running on this engine
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Report of the most recent completed pass
    pub fn last_report(&self) -> Option<SyncReport> {
        self.last_report.lock().clone()
    }

    /// The stored snapshot, without preferences applied
    pub fn cached_snapshot(&self) -> Option<Snapshot> {
        self.store.load(store::SNAPSHOT_KEY)
    }

    /// Run one synchronization pass starting from `existing`
    ///
    /// An empty `existing` makes this an initial load.
    ///
    /// # Errors
    ///
    /// `SourceUnavailable` when the first page cannot be fetched and
    /// `AlreadyInProgress` when another pass is running on this engine
    pub async fn synchronize(&self, existing: Snapshot) -> SyncResult<Snapshot> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(SyncError::AlreadyInProgress)?;
        self.run_pass(existing).await
    }

    /// Return the library, from the store when allowed
    ///
    /// With `use_cache`, a stored snapshot is returned immediately; if it is
    /// older than the staleness window a background refresh is started. A
    /// missing snapshot, or `use_cache == false`, runs a full pass.
    pub async fn fetch_all(self: &Arc<Self>, use_cache: bool) -> SyncResult<FetchOutcome> {
        if use_cache {
            if let Some(mut cached) = self.cached_snapshot().filter(|s| !s.is_empty()) {
                let background_refresh = if cached.is_stale(self.config.stale_after, Utc::now()) {
                    info!("Cached library is stale, refreshing in the background");
                    self.refresh_in_background(cached.clone())
                } else {
                    None
                };

                self.preferences.apply(&mut cached);
                return Ok(FetchOutcome {
                    snapshot: cached,
                    source: SnapshotSource::Cache,
                    background_refresh,
                });
            }
        }

        let snapshot = self.synchronize(Snapshot::default()).await?;
        Ok(FetchOutcome {
            snapshot,
            source: SnapshotSource::Remote,
            background_refresh: None,
        })
    }

    /// Start a detached refresh from `existing`
    ///
    /// Returns `None` when a pass is already running. Failures are logged and
    /// published on [`SyncEngine::background_failures`].
    pub fn refresh_in_background(self: &Arc<Self>, existing: Snapshot) -> Option<JoinHandle<()>> {
        let Some(guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!("Refresh already in flight, not starting another");
            return None;
        };

        let engine = Arc::clone(self);
        Some(tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = engine.run_pass(existing).await {
                error!("Background refresh failed: {}", e);
                let _ = engine.failures.send(Arc::new(e));
            }
        }))
    }

    /// Merge preference flags for one record and rewrite the stored copy
    pub fn update_preferences(
        &self,
        id: &str,
        update: GamePreferences,
    ) -> StoreResult<GamePreferences> {
        self.preferences.set(id, update)
    }

    async fn run_pass(&self, existing: Snapshot) -> SyncResult<Snapshot> {
        let started = Instant::now();
        let initial_load = existing.is_empty();
        let mut report = SyncReport::new(initial_load);
        let mut working = WorkingSnapshot::from_records(existing.records);
        working.set_profile(existing.profile);
        let preferences = self.preferences.load();
        let persister = DebouncedPersister::new(self.store.clone(), self.config.persist_debounce);

        info!(
            "Starting {} of {} ({} known records)",
            if initial_load { "initial load" } else { "refresh" },
            self.listing.profile_name(),
            working.len()
        );

        let mut unchanged_streak = 0u32;
        let mut page = 1u32;
        loop {
            let listing = match self.listing.fetch_page(page).await {
                Ok(listing) => listing,
                Err(e) if page == 1 => {
                    return Err(SyncError::SourceUnavailable {
                        page,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Stopping at page {}: {}", page, e);
                    report.truncated = true;
                    break;
                }
            };
            report.pages_fetched += 1;

            if page == 1 {
                let profile = self.profile_from(&listing, working.profile());
                working.set_profile(Some(profile));
            }

            if listing.records.is_empty() {
                if listing.has_more {
                    warn!("Page {} is empty but claims more pages, stopping", page);
                }
                break;
            }

            let mut page_changes = 0usize;
            let mut unsettled = false;
            for (batch_index, batch) in listing
                .records
                .chunks(self.config.detail_batch_size.max(1))
                .enumerate()
            {
                if batch_index > 0 && !self.config.batch_pause.is_zero() {
                    tokio::time::sleep(self.config.batch_pause).await;
                }

                let results = join_all(batch.iter().map(|record| self.fetch_detail(record))).await;

                for (record, result) in batch.iter().zip(results) {
                    let mut fetched = match result {
                        Ok(fetched) => fetched,
                        Err(e) => {
                            warn!("Skipping {} for this pass: {}", record.title, e);
                            report.skipped += 1;
                            // An unknown record we could not see might have changed
                            if !working.contains(&record.id) {
                                unsettled = true;
                            }
                            continue;
                        }
                    };

                    if let Some(prefs) = preferences.get(fetched.id()) {
                        prefs.apply_to(&mut fetched);
                    }

                    match working.merge(fetched) {
                        MergeOutcome::Inserted => {
                            page_changes += 1;
                            report.inserted += 1;
                            if initial_load {
                                self.subscribers.notify(working.snapshot());
                            }
                        }
                        MergeOutcome::Updated => {
                            page_changes += 1;
                            report.updated += 1;
                        }
                        MergeOutcome::Unchanged => report.unchanged += 1,
                    }
                }
            }

            debug!(
                "Page {}: {} records, {} changed",
                page,
                listing.records.len(),
                page_changes
            );

            if page_changes > 0 {
                unchanged_streak = 0;
                persister.schedule(working.to_snapshot());
                self.subscribers.notify(working.snapshot());
            } else if !unsettled {
                unchanged_streak += 1;
            }

            if !initial_load && unchanged_streak >= self.config.unchanged_page_limit {
                info!(
                    "No changes on {} consecutive pages, stopping at page {}",
                    unchanged_streak, page
                );
                report.early_terminated = true;
                break;
            }

            if !listing.has_more {
                break;
            }
            page += 1;
        }

        persister.cancel();

        let mut snapshot = working.into_snapshot();
        snapshot.updated_at = Some(Utc::now());
        self.preferences.apply(&mut snapshot);
        if let Err(e) = persist::write_final(&self.store, &snapshot) {
            warn!("{}", e);
        }

        report.duration = started.elapsed();
        info!("Synchronization finished: {}", report);
        *self.last_report.lock() = Some(report);

        Ok(snapshot)
    }

    /// Fetch one record's detail, retrying with linear backoff
    async fn fetch_detail(&self, record: &ListingRecord) -> FetchResult<DetailedRecord> {
        let details = &self.details;
        retry_with(
            &self.config.detail_retry,
            |attempt| {
                if attempt > 1 {
                    debug!("Retrying detail for {} (attempt {})", record.id, attempt);
                }
                details.fetch_detail(record)
            },
            |_| true,
        )
        .await
        .map_err(|exhausted| {
            debug!("Last detail error for {}: {}", record.id, exhausted.error);
            FetchError::DetailFetchFailed {
                id: record.id.clone(),
                attempts: exhausted.attempts,
            }
        })
    }

    fn profile_from(&self, first_page: &ListingPage, previous: Option<&Profile>) -> Profile {
        let total_games = first_page
            .total_games
            .or_else(|| previous.map(|p| p.total_games))
            .unwrap_or(first_page.records.len() as u64);
        let last_updated = first_page
            .records
            .first()
            .map(|record| record.last_activity_date.clone())
            .unwrap_or_default();

        Profile {
            username: self.listing.profile_name().to_string(),
            total_games,
            last_updated,
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("profile", &self.listing.profile_name())
            .field("config", &self.config)
            .field("syncing", &self.is_syncing())
            .finish()
    }
}

#[cfg(test)]
mod tests;
