//! Cover art lookups
//!
//! A [`LookupProvider`] turns a key (a game title) into an external URL. The
//! [`CoverResolver`] puts the shared [`LookupCache`] in front of a provider:
//! cached and protected entries answer immediately, everything else is
//! resolved with linear-backoff retries and recorded, hit or miss, so the
//! same failed lookup is not repeated until someone overrides it by hand.

pub mod config;
pub mod igdb;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::app::cache::LookupCache;
use crate::app::retry::retry_with;
use crate::errors::LookupResult;

pub use config::{ArtworkKind, LookupConfig};
pub use igdb::IgdbProvider;

/// External service that resolves a lookup key
#[async_trait]
pub trait LookupProvider: Send + Sync {
    /// Resolve `key`; `Ok(None)` means the provider knows of no value
    async fn resolve(&self, key: &str) -> LookupResult<Option<String>>;
}

/// Cache-fronted resolver for cover URLs
pub struct CoverResolver {
    cache: Arc<LookupCache>,
    provider: Arc<dyn LookupProvider>,
    config: LookupConfig,
}

impl CoverResolver {
    pub fn new(
        cache: Arc<LookupCache>,
        provider: Arc<dyn LookupProvider>,
        config: LookupConfig,
    ) -> Self {
        Self {
            cache,
            provider,
            config,
        }
    }

    /// The shared cache this resolver writes to
    pub fn cache(&self) -> &Arc<LookupCache> {
        &self.cache
    }

    /// Cover URL for `title`, resolving through the provider if needed
    ///
    /// Provider failures are absorbed: after the retry budget is spent the key
    /// is stored as a negative result and `None` is returned.
    pub async fn cover_for(&self, title: &str) -> Option<String> {
        if let Some(entry) = self.cache.entry(title) {
            if entry.is_protected() || entry.value.is_some() {
                debug!("Cover cache hit for '{}'", title);
                return entry.value;
            }
        }

        let provider = &self.provider;
        let outcome = retry_with(
            &self.config.retry,
            |_| provider.resolve(title),
            |error| error.is_transient(),
        )
        .await;

        let value = match outcome {
            Ok(value) => value,
            Err(exhausted) => {
                warn!(
                    "Cover lookup for '{}' failed after {} attempt(s): {}",
                    title, exhausted.attempts, exhausted.error
                );
                None
            }
        };

        self.cache.set(title, value, false);
        self.cache.mark_fetched(title);

        // A manual override may have landed while we were resolving
        self.cache.get(title)
    }

    /// Pin a cover by hand; replaces whatever was resolved
    pub fn set_manual(&self, title: &str, url: Option<String>) {
        self.cache.set(title, url, true);
    }
}
