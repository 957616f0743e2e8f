//! Command handlers for Sharenite Mirror CLI
//!
//! This module implements the command handlers that coordinate between
//! CLI arguments and the core application functionality.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app::{
    CoverResolver, DetailedRecord, FileStore, IgdbProvider, JsonStore, LookupCache,
    PreferenceOverlay, ShareniteClient, Snapshot, SnapshotSource, SyncEngine,
};
use crate::cli::{CacheAction, CacheArgs, CoverArgs, GlobalArgs, ListArgs, PrefsArgs, SyncArgs};
use crate::cli::progress::SyncProgress;
use crate::config::AppConfig;
use crate::constants::{env, store};
use crate::errors::{AppError, Result};

/// Everything a command needs besides its own arguments
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: AppConfig,
    pub store: JsonStore,
    pub user: Option<String>,
    pub quiet: bool,
}

impl CommandContext {
    /// Open the store named by `--store-dir`, the config file, or the default location
    pub fn new(global: &GlobalArgs, config: AppConfig) -> Result<Self> {
        let root = global
            .store_dir
            .clone()
            .or_else(|| config.store.root.clone());
        let file_store = match root {
            Some(root) => FileStore::open(root)?,
            None => FileStore::open_default()?,
        };
        debug!("Using store at {}", file_store.root().display());

        Ok(Self {
            config,
            store: JsonStore::new(Arc::new(file_store)),
            user: global.user.clone(),
            quiet: global.quiet,
        })
    }

    fn username(&self) -> Result<String> {
        self.config
            .resolve_username(self.user.as_deref())
            .ok_or_else(|| {
                AppError::generic(format!(
                    "No Sharenite username. Pass --user, set `username` in the config file, or set {}",
                    env::USERNAME
                ))
            })
    }

    fn covers(&self) -> Arc<LookupCache> {
        Arc::new(LookupCache::new(self.config.cache.clone(), self.store.clone()))
    }
}

/// Handle the sync command
///
/// Serves the stored library when it is fresh, otherwise walks the profile
/// pages until the library is current. `--force` always walks every page.
pub async fn handle_sync(ctx: &CommandContext, args: SyncArgs) -> Result<()> {
    let username = ctx.username()?;
    info!("Synchronizing library of {}", username);

    let client = Arc::new(ShareniteClient::with_config(
        username.as_str(),
        &ctx.config.client,
    )?);
    let engine = Arc::new(SyncEngine::new(
        client.clone(),
        client,
        ctx.store.clone(),
        ctx.config.sync.clone(),
    ));

    let mut failures = engine.background_failures();
    let mut progress = SyncProgress::new(!ctx.quiet);
    progress.attach(&engine);

    let outcome = match engine.fetch_all(!args.force).await {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.finish();
            return Err(e.into());
        }
    };

    let mut snapshot = outcome.snapshot;
    if let Some(handle) = outcome.background_refresh {
        progress.set_message("Cached library is stale, refreshing...");
        if let Err(e) = handle.await {
            warn!("Background refresh task ended abnormally: {}", e);
        }
        if let Ok(failure) = failures.try_recv() {
            progress.finish();
            return Err(AppError::generic(format!("Refresh failed: {}", failure)));
        }
        if let Some(mut refreshed) = engine.cached_snapshot() {
            PreferenceOverlay::new(ctx.store.clone()).apply(&mut refreshed);
            snapshot = refreshed;
        }
    }
    progress.finish();

    match (outcome.source, engine.last_report()) {
        (_, Some(report)) => println!("✅ {}: {}", username, report),
        (SnapshotSource::Cache, None) => {
            println!("✅ {}: library is up to date (from cache)", username)
        }
        (SnapshotSource::Remote, None) => println!("✅ {}: synchronized", username),
    }
    print_summary(&snapshot);
    Ok(())
}

/// Handle the list command
pub async fn handle_list(ctx: &CommandContext, args: ListArgs) -> Result<()> {
    let Some(mut snapshot) = ctx.store.load::<Snapshot>(store::SNAPSHOT_KEY) else {
        println!("No library stored yet. Run 'sharenite_mirror sync' first.");
        return Ok(());
    };
    PreferenceOverlay::new(ctx.store.clone()).apply(&mut snapshot);

    let matching: Vec<&DetailedRecord> = snapshot
        .records
        .iter()
        .filter(|record| !args.favorites || record.favorite)
        .filter(|record| !args.completed || record.completed)
        .filter(|record| !args.played || record.has_been_played())
        .take(args.limit.unwrap_or(usize::MAX))
        .collect();

    if matching.is_empty() {
        println!("No games match the given filters");
        return Ok(());
    }

    let title_width = matching
        .iter()
        .map(|record| record.title().chars().count())
        .max()
        .unwrap_or(0)
        .clamp(5, 48);

    println!(
        "{:<12} {:<width$} {:>10} {:>6}  {}",
        "ID",
        "Title",
        "Playtime",
        "Plays",
        "Last activity",
        width = title_width
    );
    for record in &matching {
        println!(
            "{:<12} {:<width$} {:>10} {:>6}  {}{}",
            record.id(),
            truncate(record.title(), title_width),
            record.play_time,
            record.play_count,
            record.listing.last_activity,
            flags(record),
            width = title_width
        );
    }
    println!();
    println!("{} of {} games shown", matching.len(), snapshot.len());
    Ok(())
}

/// Handle the prefs command
pub async fn handle_prefs(ctx: &CommandContext, args: PrefsArgs) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let overlay = PreferenceOverlay::new(ctx.store.clone());
    let merged = overlay.set(&args.id, args.preferences())?;
    info!("Updated preferences for {}: {:?}", args.id, merged);

    println!(
        "✅ {}: favorite={} completed={}",
        args.id,
        merged.favorite.unwrap_or(false),
        merged.completed.unwrap_or(false)
    );
    Ok(())
}

/// Handle the cover command
///
/// With `--set` or `--none` the cover is pinned by hand; otherwise it is read
/// from the cache or resolved through the configured provider.
pub async fn handle_cover(ctx: &CommandContext, args: CoverArgs) -> Result<()> {
    let cache = ctx.covers();

    if let Some(value) = args.manual_value() {
        cache.set(&args.title, value.clone(), true);
        match value {
            Some(url) => println!("📌 {} -> {}", args.title, url),
            None => println!("📌 {} -> no cover", args.title),
        }
        return Ok(());
    }

    if let Some(entry) = cache.entry(&args.title) {
        if entry.is_protected() || entry.value.is_some() {
            print_cover(&args.title, entry.value.as_deref());
            return Ok(());
        }
    }

    let http = ctx.config.client.build_http_client()?;
    let provider = Arc::new(IgdbProvider::from_env(http, ctx.config.lookup.artwork)?);
    let resolver = CoverResolver::new(cache, provider, ctx.config.lookup.clone());

    let cover = resolver.cover_for(&args.title).await;
    print_cover(&args.title, cover.as_deref());
    Ok(())
}

/// Handle cover cache management commands
pub async fn handle_cache(ctx: &CommandContext, args: CacheArgs) -> Result<()> {
    let cache = ctx.covers();
    match args.action {
        CacheAction::Stats => {
            let stats = cache.stats();
            println!("📊 Cover cache: {}", stats);
            if stats.is_near_capacity(90.0) {
                println!("   Cache is nearly full; the oldest automatic entries will be evicted");
            }
        }
        CacheAction::Clear => {
            let removed = cache.len();
            cache.clear();
            println!("🧹 Removed {} cached covers", removed);
        }
    }
    Ok(())
}

fn print_summary(snapshot: &Snapshot) {
    let played = snapshot
        .records
        .iter()
        .filter(|record| record.has_been_played())
        .count();
    let favorites = snapshot.records.iter().filter(|r| r.favorite).count();

    match &snapshot.profile {
        Some(profile) => println!(
            "   {} games mirrored ({} listed on profile), {} played, {} favorites",
            snapshot.len(),
            profile.total_games,
            played,
            favorites
        ),
        None => println!(
            "   {} games mirrored, {} played, {} favorites",
            snapshot.len(),
            played,
            favorites
        ),
    }
}

fn print_cover(title: &str, cover: Option<&str>) {
    match cover {
        Some(url) => println!("🖼  {} -> {}", title, url),
        None => println!("🖼  {} -> no cover found", title),
    }
}

fn flags(record: &DetailedRecord) -> &'static str {
    match (record.favorite, record.completed) {
        (true, true) => "  ★ ✓",
        (true, false) => "  ★",
        (false, true) => "  ✓",
        (false, false) => "",
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}
