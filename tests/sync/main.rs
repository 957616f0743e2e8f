//! Integration tests for library synchronization
//!
//! A scripted site serves Sharenite-shaped HTML, which goes through the real
//! page parsers before reaching the engine. The store is a file store in a
//! temporary directory, so every pass survives an engine restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use sharenite_mirror::app::client::parse::{parse_detail_page, parse_listing_page};
use sharenite_mirror::app::models::{DetailedRecord, ListingPage, ListingRecord};
use sharenite_mirror::app::{
    DetailSource, FileStore, GamePreferences, JsonStore, ListingSource, RetryPolicy,
    SnapshotSource, SyncConfig, SyncEngine,
};
use sharenite_mirror::errors::{FetchError, FetchResult};

const PROFILE_URL: &str = "https://www.sharenite.link/profiles/alice";

struct Game {
    id: String,
    title: String,
    activity: String,
    playtime: String,
    plays: u32,
}

/// Remote library laid out in pages, most recently active first
struct ScriptedSite {
    pages: Mutex<Vec<Vec<Game>>>,
    page_requests: AtomicUsize,
    detail_requests: AtomicUsize,
}

impl ScriptedSite {
    fn new(page_sizes: &[usize]) -> Self {
        let pages = page_sizes
            .iter()
            .enumerate()
            .map(|(p, size)| {
                (0..*size)
                    .map(|n| Game {
                        id: format!("{}{:02}", p + 1, n),
                        title: format!("Game {}-{}", p + 1, n),
                        activity: "2026-01-01T00:00:00Z".to_string(),
                        playtime: "01:00:00".to_string(),
                        plays: 1,
                    })
                    .collect()
            })
            .collect();
        Self {
            pages: Mutex::new(pages),
            page_requests: AtomicUsize::new(0),
            detail_requests: AtomicUsize::new(0),
        }
    }

    fn total(&self) -> usize {
        self.pages.lock().iter().map(Vec::len).sum()
    }

    /// Record a play session for a game on the first page
    fn play(&self, index: usize, playtime: &str, activity: &str) {
        let mut pages = self.pages.lock();
        let game = &mut pages[0][index];
        game.playtime = playtime.to_string();
        game.plays += 1;
        game.activity = activity.to_string();
    }

    fn reset_counters(&self) {
        self.page_requests.store(0, Ordering::SeqCst);
        self.detail_requests.store(0, Ordering::SeqCst);
    }

    fn listing_html(&self, page: u32) -> String {
        let pages = self.pages.lock();
        let total: usize = pages.iter().map(Vec::len).sum();
        let index = (page - 1) as usize;

        let mut html = format!(
            "<html><body><p>Total games listed: {}</p><ul class=\"list-group\">\
             <li class=\"list-group-item\" id=\"header\"><strong>Name</strong></li>",
            total
        );
        for game in pages.get(index).into_iter().flatten() {
            html.push_str(&format!(
                "<li class=\"list-group-item\" id=\"game_{}\">\
                 <div class=\"col\"><strong>{}</strong></div>\
                 <div class=\"col-3\"><abbr title=\"{}\">recently</abbr></div></li>",
                game.id, game.title, game.activity
            ));
        }
        html.push_str("</ul>");
        if index + 1 < pages.len() {
            html.push_str(&format!(
                "<ul class=\"pagination\"><li><a class=\"page-link\" rel=\"next\" \
                 href=\"?page={}\">Next</a></li></ul>",
                page + 1
            ));
        }
        html.push_str("</body></html>");
        html
    }

    fn detail_html(&self, id: &str) -> Option<String> {
        let pages = self.pages.lock();
        pages.iter().flatten().find(|game| game.id == id).map(|game| {
            format!(
                "<html><body><div class=\"text-muted\">Playtime: {}</div>\
                 <div class=\"text-muted\">Play count: {}</div>\
                 <div class=\"text-muted\">PC (Windows)</div></body></html>",
                game.playtime, game.plays
            )
        })
    }
}

#[async_trait]
impl ListingSource for ScriptedSite {
    async fn fetch_page(&self, page: u32) -> FetchResult<ListingPage> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        parse_listing_page(&self.listing_html(page), PROFILE_URL, page)
    }

    fn profile_name(&self) -> &str {
        "alice"
    }
}

#[async_trait]
impl DetailSource for ScriptedSite {
    async fn fetch_detail(&self, record: &ListingRecord) -> FetchResult<DetailedRecord> {
        self.detail_requests.fetch_add(1, Ordering::SeqCst);
        let html = self
            .detail_html(&record.id)
            .ok_or(FetchError::Status { status: 404 })?;
        let details = parse_detail_page(&html)?;
        Ok(DetailedRecord::from_listing(record.clone(), details))
    }
}

fn config() -> SyncConfig {
    SyncConfig::default()
        .with_batch_pause(Duration::ZERO)
        .with_detail_retry(RetryPolicy::new(2, Duration::from_millis(1)))
        .with_persist_debounce(Duration::from_millis(10))
}

fn open_store(dir: &TempDir) -> JsonStore {
    JsonStore::new(Arc::new(FileStore::open(dir.path()).unwrap()))
}

fn engine(site: &Arc<ScriptedSite>, store: JsonStore) -> Arc<SyncEngine> {
    Arc::new(SyncEngine::new(site.clone(), site.clone(), store, config()))
}

#[tokio::test]
async fn test_initial_load_survives_restart() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::new(&[5, 5, 3]));

    let first = engine(&site, open_store(&dir));
    let outcome = first.fetch_all(true).await.unwrap();
    assert_eq!(outcome.source, SnapshotSource::Remote);
    assert_eq!(outcome.snapshot.len(), 13);
    assert_eq!(site.page_requests.load(Ordering::SeqCst), 3);

    let profile = outcome.snapshot.profile.clone().unwrap();
    assert_eq!(profile.username, "alice");
    assert_eq!(profile.total_games, site.total() as u64);

    // A new engine over the same directory serves the fresh copy
    site.reset_counters();
    let second = engine(&site, open_store(&dir));
    let outcome = second.fetch_all(true).await.unwrap();
    assert_eq!(outcome.source, SnapshotSource::Cache);
    assert!(outcome.background_refresh.is_none());
    assert_eq!(outcome.snapshot.len(), 13);
    assert_eq!(site.page_requests.load(Ordering::SeqCst), 0);

    let game = outcome.snapshot.get("100").unwrap();
    assert_eq!(game.play_time, "01:00:00");
    assert_eq!(game.platform.as_deref(), Some("PC (Windows)"));
}

#[tokio::test]
async fn test_refresh_picks_up_new_play_session() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::new(&[4, 4, 4, 4, 4, 4]));
    let engine = engine(&site, open_store(&dir));

    let initial = engine.synchronize(Default::default()).await.unwrap();
    assert_eq!(initial.len(), 24);

    site.play(1, "03:15:00", "2026-10-19T09:00:00Z");
    site.reset_counters();

    let refreshed = engine.synchronize(initial).await.unwrap();
    let game = refreshed.get("101").unwrap();
    assert_eq!(game.play_time, "03:15:00");
    assert_eq!(game.play_count, 2);

    // Page 1 changed, pages 2-4 did not; the walk stops there
    assert_eq!(site.page_requests.load(Ordering::SeqCst), 4);
    let report = engine.last_report().unwrap();
    assert_eq!(report.updated, 1);
    assert!(report.early_terminated);
    assert_eq!(refreshed.len(), 24);
}

#[tokio::test]
async fn test_preferences_survive_refresh_and_restart() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ScriptedSite::new(&[3]));

    let first = engine(&site, open_store(&dir));
    let initial = first.synchronize(Default::default()).await.unwrap();
    first
        .update_preferences(
            "101",
            GamePreferences {
                favorite: Some(true),
                completed: None,
            },
        )
        .unwrap();

    site.play(1, "02:00:00", "2026-10-19T09:00:00Z");
    let refreshed = first.synchronize(initial).await.unwrap();
    let game = refreshed.get("101").unwrap();
    assert!(game.favorite);
    assert_eq!(game.play_time, "02:00:00");

    let second = engine(&site, open_store(&dir));
    let outcome = second.fetch_all(false).await.unwrap();
    assert_eq!(outcome.source, SnapshotSource::Remote);
    let game = outcome.snapshot.get("101").unwrap();
    assert!(game.favorite);
    assert!(!game.completed);
}
