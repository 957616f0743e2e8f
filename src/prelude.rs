//! Prelude module for Sharenite Mirror
//!
//! Re-exports the items most integrations need, so a single
//! `use sharenite_mirror::prelude::*;` is enough for typical usage.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sharenite_mirror::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = JsonStore::new(Arc::new(MemoryStore::new()));
//!     let covers = Arc::new(LookupCache::new(CacheConfig::default(), store.clone()));
//!     let client = Arc::new(ShareniteClient::new("alice")?);
//!     let engine = Arc::new(SyncEngine::new(client.clone(), client, store, SyncConfig::default()));
//!
//!     let outcome = engine.fetch_all(true).await?;
//!     for game in &outcome.snapshot.records {
//!         println!("{} -> {:?}", game.title(), covers.get(game.title()));
//!     }
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components
pub use crate::app::{
    CacheConfig, CacheStats, ClientConfig, CoverResolver, DetailSource, DetailedRecord,
    FetchOutcome, GamePreferences, JsonStore, KeyValueStore, ListingRecord, ListingSource,
    LookupCache, LookupProvider, MemoryStore, FileStore, ShareniteClient, Snapshot,
    SnapshotSource, SyncConfig, SyncEngine, SyncReport,
};

// Configuration
pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{COVER_CACHE_KEY, PREFERENCES_KEY, SNAPSHOT_KEY, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::sync::Arc;

pub use tokio;
