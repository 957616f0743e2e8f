//! Core application logic for Sharenite Mirror
//!
//! This module contains the library synchronization engine, the bounded cover
//! lookup cache, the persistent store they share, and the Sharenite and IGDB
//! clients that feed them.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sharenite_mirror::app::{FileStore, JsonStore, ShareniteClient, SyncConfig, SyncEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(ShareniteClient::new("alice")?);
//! let store = JsonStore::new(Arc::new(FileStore::open_default()?));
//! let engine = Arc::new(SyncEngine::new(
//!     client.clone(),
//!     client,
//!     store,
//!     SyncConfig::default(),
//! ));
//!
//! let outcome = engine.fetch_all(true).await?;
//! println!("{} games", outcome.snapshot.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod lookup;
pub mod models;
pub mod preferences;
pub mod retry;
pub mod store;
pub mod sync;

// Re-export main public API
pub use cache::{CacheConfig, CacheEntry, CacheStats, LookupCache};
pub use client::{ClientConfig, ShareniteClient};
pub use lookup::{ArtworkKind, CoverResolver, IgdbProvider, LookupConfig, LookupProvider};
pub use models::{DetailedRecord, ListingPage, ListingRecord, Profile, RecordDetails, Snapshot};
pub use preferences::{GamePreferences, PreferenceMap, PreferenceOverlay};
pub use retry::RetryPolicy;
pub use store::{FileStore, JsonStore, KeyValueStore, MemoryStore};
pub use sync::{
    DetailSource, FetchOutcome, ListingSource, SnapshotSource, Subscription, SyncConfig,
    SyncEngine, SyncReport,
};
