//! Tests for the synchronization engine
//!
//! The listing and detail sources are in-memory fakes whose remote state can
//! be changed between passes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::*;
use crate::app::models::RecordDetails;
use crate::app::retry::RetryPolicy;
use crate::app::store::MemoryStore;

struct FakeListing {
    pages: Vec<Vec<ListingRecord>>,
    failing: Mutex<HashSet<u32>>,
    requested: Mutex<Vec<u32>>,
    delay: Duration,
    endless: bool,
}

impl FakeListing {
    fn new(pages: Vec<Vec<ListingRecord>>) -> Self {
        Self {
            pages,
            failing: Mutex::new(HashSet::new()),
            requested: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            endless: false,
        }
    }

    /// Claim another page after every page, even past the last one
    fn endless(mut self) -> Self {
        self.endless = true;
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn fail_page(&self, page: u32) {
        self.failing.lock().insert(page);
    }

    fn requested(&self) -> Vec<u32> {
        self.requested.lock().clone()
    }

    fn clear_requests(&self) {
        self.requested.lock().clear();
    }

    fn total(&self) -> u64 {
        self.pages.iter().map(|page| page.len() as u64).sum()
    }
}

#[async_trait]
impl ListingSource for FakeListing {
    async fn fetch_page(&self, page: u32) -> FetchResult<ListingPage> {
        self.requested.lock().push(page);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.lock().contains(&page) {
            return Err(FetchError::Status { status: 500 });
        }

        let index = (page - 1) as usize;
        let records = self.pages.get(index).cloned().unwrap_or_default();
        let has_more = self.endless || index + 1 < self.pages.len();
        let mut listing = ListingPage::new(records, has_more);
        if page == 1 {
            listing = listing.with_total_games(self.total());
        }
        Ok(listing)
    }

    fn profile_name(&self) -> &str {
        "alice"
    }
}

#[derive(Default)]
struct FakeDetails {
    activity: Mutex<HashMap<String, (String, u32)>>,
    failures: Mutex<HashMap<String, u32>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl FakeDetails {
    fn set_activity(&self, id: &str, play_time: &str, play_count: u32) {
        self.activity
            .lock()
            .insert(id.to_string(), (play_time.to_string(), play_count));
    }

    fn fail_times(&self, id: &str, times: u32) {
        self.failures.lock().insert(id.to_string(), times);
    }

    fn calls(&self, id: &str) -> u32 {
        self.calls.lock().get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl DetailSource for FakeDetails {
    async fn fetch_detail(&self, record: &ListingRecord) -> FetchResult<DetailedRecord> {
        *self.calls.lock().entry(record.id.clone()).or_insert(0) += 1;

        if let Some(remaining) = self.failures.lock().get_mut(&record.id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::Status { status: 502 });
            }
        }

        let (play_time, play_count) = self
            .activity
            .lock()
            .get(&record.id)
            .cloned()
            .unwrap_or_else(|| ("00:00:00".to_string(), 0));

        Ok(DetailedRecord::from_listing(
            record.clone(),
            RecordDetails {
                play_time: Some(play_time),
                play_count: Some(play_count),
                ..Default::default()
            },
        ))
    }
}

fn listing_record(id: &str) -> ListingRecord {
    ListingRecord::new(
        id,
        format!("Game {}", id),
        "a day ago",
        "2024-05-01T12:00:00Z",
        format!("https://example.test/games/{}", id),
    )
}

/// Pages of records named `p<page>-<n>`
fn pages(sizes: &[usize]) -> Vec<Vec<ListingRecord>> {
    sizes
        .iter()
        .enumerate()
        .map(|(page, &size)| {
            (0..size)
                .map(|n| listing_record(&format!("p{}-{}", page + 1, n)))
                .collect()
        })
        .collect()
}

fn fast_config() -> SyncConfig {
    SyncConfig::default()
        .with_batch_pause(Duration::ZERO)
        .with_detail_retry(RetryPolicy::new(3, Duration::from_millis(1)))
        .with_persist_debounce(Duration::from_millis(10))
}

struct Harness {
    engine: Arc<SyncEngine>,
    listing: Arc<FakeListing>,
    details: Arc<FakeDetails>,
    store: JsonStore,
}

fn harness(listing: FakeListing) -> Harness {
    harness_with(listing, fast_config())
}

fn harness_with(listing: FakeListing, config: SyncConfig) -> Harness {
    let listing = Arc::new(listing);
    let details = Arc::new(FakeDetails::default());
    let store = JsonStore::new(Arc::new(MemoryStore::new()));
    let engine = Arc::new(SyncEngine::new(
        listing.clone(),
        details.clone(),
        store.clone(),
        config,
    ));
    Harness {
        engine,
        listing,
        details,
        store,
    }
}

fn ids(snapshot: &Snapshot) -> HashSet<String> {
    snapshot
        .records
        .iter()
        .map(|record| record.id().to_string())
        .collect()
}

#[tokio::test]
async fn test_initial_load_walks_all_pages() {
    let h = harness(FakeListing::new(pages(&[2, 2, 1])));
    let counts = Arc::new(Mutex::new(Vec::new()));
    let seen = counts.clone();
    h.engine.subscribe(move |snapshot| seen.lock().push(snapshot.len()));

    let snapshot = h.engine.synchronize(Snapshot::default()).await.unwrap();

    assert_eq!(snapshot.len(), 5);
    assert_eq!(h.listing.requested(), vec![1, 2, 3]);

    let counts = counts.lock().clone();
    assert!(counts.len() >= 3, "expected at least 3 notifications, got {:?}", counts);
    assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(counts.last().copied(), Some(5));

    let profile = snapshot.profile.as_ref().unwrap();
    assert_eq!(profile.username, "alice");
    assert_eq!(profile.total_games, 5);
    assert_eq!(profile.last_updated, "2024-05-01T12:00:00Z");

    let stored: Snapshot = h.store.load(store::SNAPSHOT_KEY).unwrap();
    assert_eq!(ids(&stored), ids(&snapshot));
    assert!(stored.updated_at.is_some());

    let report = h.engine.last_report().unwrap();
    assert!(report.initial_load);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.inserted, 5);
    assert!(!report.early_terminated);
}

#[tokio::test]
async fn test_refresh_stops_after_unchanged_pages() {
    let h = harness(FakeListing::new(pages(&[3; 10])));
    let existing = h.engine.synchronize(Snapshot::default()).await.unwrap();
    assert_eq!(existing.len(), 30);
    h.listing.clear_requests();

    for page in 1..=3 {
        h.details.set_activity(&format!("p{}-0", page), "01:30:00", 2);
    }

    let refreshed = h.engine.synchronize(existing).await.unwrap();

    assert_eq!(h.listing.requested(), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(refreshed.len(), 30);
    assert_eq!(refreshed.get("p2-0").unwrap().play_time, "01:30:00");

    let report = h.engine.last_report().unwrap();
    assert!(report.early_terminated);
    assert_eq!(report.updated, 3);
    assert_eq!(report.inserted, 0);
}

#[tokio::test]
async fn test_refresh_without_changes_is_idempotent() {
    let h = harness(FakeListing::new(pages(&[3, 3])));
    let first = h.engine.synchronize(Snapshot::default()).await.unwrap();

    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = notifications.clone();
    h.engine.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let second = h.engine.synchronize(first.clone()).await.unwrap();

    assert_eq!(second.records, first.records);
    assert_eq!(second.profile, first.profile);
    assert_eq!(notifications.load(Ordering::SeqCst), 0);
    assert_eq!(h.engine.last_report().unwrap().changed(), 0);
}

#[tokio::test]
async fn test_new_records_are_inserted_on_refresh() {
    let h = harness(FakeListing::new(pages(&[2])));
    let mut existing = h.engine.synchronize(Snapshot::default()).await.unwrap();
    existing.records.remove(0);

    let refreshed = h.engine.synchronize(existing).await.unwrap();

    assert_eq!(refreshed.len(), 2);
    assert_eq!(h.engine.last_report().unwrap().inserted, 1);
}

#[tokio::test]
async fn test_preferences_survive_refresh() {
    let h = harness(FakeListing::new(pages(&[2])));
    h.engine.synchronize(Snapshot::default()).await.unwrap();

    h.engine
        .update_preferences(
            "p1-1",
            GamePreferences {
                favorite: Some(true),
                completed: None,
            },
        )
        .unwrap();

    let cached = h.engine.cached_snapshot().unwrap();
    assert!(cached.get("p1-1").unwrap().favorite);

    h.details.set_activity("p1-1", "10:00:00", 4);
    let refreshed = h.engine.synchronize(cached).await.unwrap();
    let record = refreshed.get("p1-1").unwrap();
    assert!(record.favorite);
    assert!(!record.completed);
    assert_eq!(record.play_time, "10:00:00");

    // A full pass from an empty baseline still carries the flag
    let outcome = h.engine.fetch_all(false).await.unwrap();
    assert_eq!(outcome.source, SnapshotSource::Remote);
    assert!(outcome.snapshot.get("p1-1").unwrap().favorite);
}

#[tokio::test]
async fn test_detail_fetch_is_retried() {
    let h = harness(FakeListing::new(pages(&[2])));
    h.details.fail_times("p1-0", 2);

    let snapshot = h.engine.synchronize(Snapshot::default()).await.unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(h.details.calls("p1-0"), 3);
    assert_eq!(h.engine.last_report().unwrap().skipped, 0);
}

#[tokio::test]
async fn test_failed_detail_keeps_previous_copy() {
    let h = harness(FakeListing::new(pages(&[2])));
    h.details.set_activity("p1-0", "02:00:00", 3);
    let existing = h.engine.synchronize(Snapshot::default()).await.unwrap();

    h.details.set_activity("p1-0", "05:00:00", 9);
    h.details.fail_times("p1-0", 10);
    let refreshed = h.engine.synchronize(existing).await.unwrap();

    let record = refreshed.get("p1-0").unwrap();
    assert_eq!(record.play_time, "02:00:00");
    assert_eq!(record.play_count, 3);
    assert_eq!(h.engine.last_report().unwrap().skipped, 1);
}

#[tokio::test]
async fn test_failed_new_record_is_left_out() {
    let h = harness(FakeListing::new(pages(&[3])));
    h.details.fail_times("p1-2", 10);

    let snapshot = h.engine.synchronize(Snapshot::default()).await.unwrap();

    assert_eq!(snapshot.len(), 2);
    assert!(!snapshot.contains("p1-2"));
    assert_eq!(h.details.calls("p1-2"), 3);
}

#[tokio::test]
async fn test_first_page_failure_is_source_unavailable() {
    let h = harness(FakeListing::new(pages(&[2, 2])));
    h.listing.fail_page(1);

    let result = h.engine.synchronize(Snapshot::default()).await;

    assert!(matches!(
        result,
        Err(SyncError::SourceUnavailable { page: 1, .. })
    ));
    assert!(h.engine.cached_snapshot().is_none());
    assert!(!h.engine.is_syncing());
}

#[tokio::test]
async fn test_later_page_failure_truncates_pass() {
    let h = harness(FakeListing::new(pages(&[2, 2, 2])));
    h.listing.fail_page(2);

    let snapshot = h.engine.synchronize(Snapshot::default()).await.unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(h.listing.requested(), vec![1, 2]);
    assert!(h.engine.last_report().unwrap().truncated);
}

#[tokio::test]
async fn test_second_pass_is_rejected_while_in_flight() {
    let h = harness(FakeListing::new(pages(&[1, 1])).with_delay(Duration::from_millis(50)));

    let engine = h.engine.clone();
    let first = tokio::spawn(async move { engine.synchronize(Snapshot::default()).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(h.engine.is_syncing());
    assert!(matches!(
        h.engine.synchronize(Snapshot::default()).await,
        Err(SyncError::AlreadyInProgress)
    ));

    let snapshot = first.await.unwrap().unwrap();
    assert_eq!(snapshot.len(), 2);
    assert!(!h.engine.is_syncing());
}

#[tokio::test]
async fn test_fresh_cache_is_served_without_a_pass() {
    let h = harness(FakeListing::new(pages(&[2])));
    let mut cached = Snapshot::from_records(vec![DetailedRecord::from_listing(
        listing_record("cached"),
        RecordDetails::default(),
    )]);
    cached.updated_at = Some(Utc::now());
    h.store.save(store::SNAPSHOT_KEY, &cached).unwrap();

    let outcome = h.engine.fetch_all(true).await.unwrap();

    assert_eq!(outcome.source, SnapshotSource::Cache);
    assert!(outcome.background_refresh.is_none());
    assert!(outcome.snapshot.contains("cached"));
    assert!(h.listing.requested().is_empty());
}

#[tokio::test]
async fn test_missing_cache_runs_a_pass() {
    let h = harness(FakeListing::new(pages(&[2])));

    let outcome = h.engine.fetch_all(true).await.unwrap();

    assert_eq!(outcome.source, SnapshotSource::Remote);
    assert_eq!(outcome.snapshot.len(), 2);
}

#[tokio::test]
async fn test_stale_cache_starts_one_background_refresh() {
    let h = harness(FakeListing::new(pages(&[2])).with_delay(Duration::from_millis(50)));
    let mut cached = Snapshot::from_records(vec![DetailedRecord::from_listing(
        listing_record("p1-0"),
        RecordDetails::default(),
    )]);
    let written = Utc::now() - chrono::Duration::hours(1);
    cached.updated_at = Some(written);
    h.store.save(store::SNAPSHOT_KEY, &cached).unwrap();

    let first = h.engine.fetch_all(true).await.unwrap();
    assert_eq!(first.source, SnapshotSource::Cache);
    assert_eq!(first.snapshot.len(), 1);
    let refresh = first.background_refresh.expect("stale cache should refresh");

    let second = h.engine.fetch_all(true).await.unwrap();
    assert_eq!(second.source, SnapshotSource::Cache);
    assert!(second.background_refresh.is_none());

    refresh.await.unwrap();

    let stored = h.engine.cached_snapshot().unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.updated_at.unwrap() > written);
    assert_eq!(h.listing.requested(), vec![1]);
}

#[tokio::test]
async fn test_background_failure_is_published() {
    let h = harness(FakeListing::new(pages(&[2])));
    h.listing.fail_page(1);
    let mut failures = h.engine.background_failures();

    let mut cached = Snapshot::from_records(vec![DetailedRecord::from_listing(
        listing_record("p1-0"),
        RecordDetails::default(),
    )]);
    cached.updated_at = Some(Utc::now() - chrono::Duration::hours(2));
    h.store.save(store::SNAPSHOT_KEY, &cached).unwrap();

    let outcome = h.engine.fetch_all(true).await.unwrap();
    outcome.background_refresh.unwrap().await.unwrap();

    let failure = failures.recv().await.unwrap();
    assert!(matches!(
        failure.as_ref(),
        SyncError::SourceUnavailable { page: 1, .. }
    ));
    assert!(!h.engine.is_syncing());
}

#[tokio::test]
async fn test_panicking_subscriber_does_not_abort_pass() {
    let h = harness(FakeListing::new(pages(&[2, 1])));
    h.engine.subscribe(|_| panic!("subscriber failure"));

    let snapshot = h.engine.synchronize(Snapshot::default()).await.unwrap();
    assert_eq!(snapshot.len(), 3);
}

#[tokio::test]
async fn test_partial_snapshot_is_persisted_mid_pass() {
    let config = fast_config().with_persist_debounce(Duration::from_millis(10));
    let h = harness_with(
        FakeListing::new(pages(&[2, 2, 2])).with_delay(Duration::from_millis(100)),
        config,
    );

    let engine = h.engine.clone();
    let pass = tokio::spawn(async move { engine.synchronize(Snapshot::default()).await });

    tokio::time::sleep(Duration::from_millis(160)).await;
    let partial: Snapshot = h.store.load(store::SNAPSHOT_KEY).expect("partial write");
    assert!(partial.len() >= 2);
    assert!(partial.len() < 6);

    let snapshot = pass.await.unwrap().unwrap();
    assert_eq!(snapshot.len(), 6);
}

#[tokio::test]
async fn test_empty_page_ends_the_walk() {
    let h = harness(FakeListing::new(pages(&[2, 2])).endless());

    let snapshot = h.engine.synchronize(Snapshot::default()).await.unwrap();

    assert_eq!(snapshot.len(), 4);
    assert_eq!(h.listing.requested(), vec![1, 2, 3]);
    assert!(!h.engine.is_syncing());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Detail(u32),
    Notified(u32),
}

fn page_of(id: &str) -> u32 {
    id.trim_start_matches('p')
        .split('-')
        .next()
        .and_then(|page| page.parse().ok())
        .unwrap_or(0)
}

/// Detail source that records call order and peak concurrency
struct TrackedDetails {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    events: Arc<Mutex<Vec<Event>>>,
}

impl TrackedDetails {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl DetailSource for TrackedDetails {
    async fn fetch_detail(&self, record: &ListingRecord) -> FetchResult<DetailedRecord> {
        self.events.lock().push(Event::Detail(page_of(&record.id)));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(DetailedRecord::from_listing(record.clone(), RecordDetails::default()))
    }
}

fn tracked_engine(
    listing: FakeListing,
    details: &Arc<TrackedDetails>,
    batch: usize,
) -> SyncEngine {
    SyncEngine::new(
        Arc::new(listing),
        details.clone(),
        JsonStore::new(Arc::new(MemoryStore::new())),
        fast_config().with_batch_size(batch),
    )
}

#[tokio::test]
async fn test_detail_fetches_are_bounded_by_batch_size() {
    let details = Arc::new(TrackedDetails::new(Duration::from_millis(5)));
    let engine = tracked_engine(FakeListing::new(pages(&[23])), &details, 5);

    let snapshot = engine.synchronize(Snapshot::default()).await.unwrap();

    assert_eq!(snapshot.len(), 23);
    assert_eq!(details.peak.load(Ordering::SeqCst), 5);
    assert_eq!(details.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_page_is_settled_before_next_page_details() {
    let details = Arc::new(TrackedDetails::new(Duration::from_millis(2)));
    let engine = tracked_engine(FakeListing::new(pages(&[3, 3, 3])), &details, 2);

    let events = details.events.clone();
    let _subscription = engine.subscribe(move |snapshot| {
        let page = snapshot
            .records
            .iter()
            .map(|record| page_of(record.id()))
            .max()
            .unwrap_or(0);
        events.lock().push(Event::Notified(page));
    });

    engine.synchronize(Snapshot::default()).await.unwrap();
    let events = details.events.lock().clone();

    // Nothing from an earlier page is fetched once a later page was announced
    for (i, event) in events.iter().enumerate() {
        if let Event::Notified(announced) = event {
            assert!(
                events[i..]
                    .iter()
                    .all(|later| !matches!(later, Event::Detail(p) if p < announced)),
                "detail for an earlier page after page {} was announced: {:?}",
                announced,
                events
            );
        }
    }

    for page in 1..3 {
        let announced = events
            .iter()
            .position(|event| *event == Event::Notified(page))
            .unwrap();
        let next_details = events
            .iter()
            .position(|event| *event == Event::Detail(page + 1))
            .unwrap();
        assert!(announced < next_details, "events: {:?}", events);
    }
}

