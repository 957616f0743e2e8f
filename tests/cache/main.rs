//! Integration tests for the cover lookup cache
//!
//! These tests drive the cache through its public API the way the cover
//! command does, including persistence through a file store.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use sharenite_mirror::app::{
    CacheConfig, CoverResolver, FileStore, JsonStore, LookupCache, LookupConfig, LookupProvider,
    MemoryStore,
};
use sharenite_mirror::errors::LookupResult;

fn memory_store() -> JsonStore {
    JsonStore::new(Arc::new(MemoryStore::new()))
}

#[test]
fn test_capacity_bound_keeps_manual_entries() {
    let cache = LookupCache::new(CacheConfig::default().with_capacity(500), memory_store());

    cache.set("game-0", Some("https://img/manual.jpg".to_string()), true);
    for i in 1..600 {
        cache.set(&format!("game-{}", i), Some(format!("https://img/{}.jpg", i)), false);
    }

    assert_eq!(cache.len(), 500);
    assert_eq!(cache.get("game-0").as_deref(), Some("https://img/manual.jpg"));

    // The oldest automatic entries went first
    assert!(cache.entry("game-1").is_none());
    assert!(cache.entry("game-100").is_none());
    assert!(cache.entry("game-101").is_some());
    assert_eq!(cache.get("game-599").as_deref(), Some("https://img/599.jpg"));

    let stats = cache.stats();
    assert_eq!(stats.entries, 500);
    assert_eq!(stats.manual, 1);
}

#[test]
fn test_cache_persists_across_restart() {
    let dir = TempDir::new().unwrap();
    let open = || JsonStore::new(Arc::new(FileStore::open(dir.path()).unwrap()));

    {
        let cache = LookupCache::new(CacheConfig::default(), open());
        cache.set("Celeste", Some("https://img/celeste.jpg".to_string()), true);
        cache.set("Unknown Game", None, false);
        cache.mark_fetched("Unknown Game");
    }

    let cache = LookupCache::new(CacheConfig::default(), open());
    assert_eq!(cache.len(), 2);
    assert!(cache.is_manually_set("Celeste"));
    assert!(cache.has_been_fetched("Unknown Game"));
    assert_eq!(cache.get("Unknown Game"), None);

    // Protection is restored along with the entries
    assert!(!cache.set("Celeste", Some("https://img/other.jpg".to_string()), false));
    assert_eq!(cache.get("Celeste").as_deref(), Some("https://img/celeste.jpg"));

    cache.clear();
    let reopened = LookupCache::new(CacheConfig::default(), open());
    assert!(reopened.is_empty());
}

struct FixedProvider;

#[async_trait]
impl LookupProvider for FixedProvider {
    async fn resolve(&self, key: &str) -> LookupResult<Option<String>> {
        Ok(Some(format!("https://img/{}.jpg", key.to_lowercase())))
    }
}

#[tokio::test]
async fn test_resolver_respects_manual_override() {
    let cache = Arc::new(LookupCache::new(CacheConfig::default(), memory_store()));
    let resolver = CoverResolver::new(cache.clone(), Arc::new(FixedProvider), LookupConfig::default());

    assert_eq!(
        resolver.cover_for("Hades").await.as_deref(),
        Some("https://img/hades.jpg")
    );

    resolver.set_manual("Hades", Some("https://img/custom.jpg".to_string()));
    assert_eq!(
        resolver.cover_for("Hades").await.as_deref(),
        Some("https://img/custom.jpg")
    );

    resolver.set_manual("Celeste", None);
    assert_eq!(resolver.cover_for("Celeste").await, None);
    assert!(cache.is_manually_set("Celeste"));
}
