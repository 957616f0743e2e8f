//! Bounded lookup cache with manual-override protection
//!
//! This module provides the cache that sits in front of slow external lookups
//! such as cover art searches. It answers reads without ever resolving, and it
//! remembers negative results so failed lookups are not retried endlessly.
//!
//! # Key Features
//!
//! - **Protected entries**: completed resolutions and manual overrides cannot
//!   be clobbered by a late automatic write
//! - **Capacity bound**: the oldest non-manual entries are evicted first
//! - **Optional TTL**: unprotected entries expire after a fixed age
//! - **Write-through persistence**: the whole cache is saved after each mutation
//!
//! # Module Organization
//!
//! - [`config`] - Configuration types and defaults
//! - [`manager`] - The [`LookupCache`] itself
//! - [`stats`] - Cache statistics
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use sharenite_mirror::app::cache::{CacheConfig, LookupCache};
//! use sharenite_mirror::app::store::{JsonStore, MemoryStore};
//!
//! let store = JsonStore::new(Arc::new(MemoryStore::new()));
//! let cache = LookupCache::new(CacheConfig::default(), store);
//!
//! cache.set("Hollow Knight", Some("https://img/hk.jpg".to_string()), true);
//! // A late automatic result does not replace the override
//! cache.set("Hollow Knight", Some("https://img/other.jpg".to_string()), false);
//! assert_eq!(cache.get("Hollow Knight").as_deref(), Some("https://img/hk.jpg"));
//! ```

pub mod config;
pub mod manager;
pub mod stats;

// Re-export main public API
pub use config::CacheConfig;
pub use manager::{CacheEntry, LookupCache};
pub use stats::CacheStats;
