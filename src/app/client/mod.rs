//! HTTP client for Sharenite profile pages
//!
//! The client fetches public profile pages with rate limiting and scrapes
//! them into listing and detail records. It implements both
//! [`ListingSource`] and [`DetailSource`] so the sync engine can drive it.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: Rate-limited page fetches with status mapping
//! - `parse`: HTML scraping of listing and detail pages

use async_trait::async_trait;
use url::Url;

use crate::app::models::{DetailedRecord, ListingPage, ListingRecord};
use crate::app::sync::{DetailSource, ListingSource};
use crate::constants::sharenite;
use crate::errors::{FetchError, FetchResult};

pub mod config;
pub mod http;
pub mod parse;

pub use config::ClientConfig;

use http::HttpHandler;

/// Scraping client for one Sharenite profile
#[derive(Debug)]
pub struct ShareniteClient {
    http_handler: HttpHandler,
    username: String,
    profile_url: Url,
}

impl ShareniteClient {
    /// Creates a client for `username` with default configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the HTTP client cannot be built
    pub fn new(username: impl Into<String>) -> FetchResult<Self> {
        Self::with_config(username, &ClientConfig::default())
    }

    /// Creates a client for `username` with custom configuration
    pub fn with_config(username: impl Into<String>, config: &ClientConfig) -> FetchResult<Self> {
        let username = username.into();
        let profile_url = profile_url(&config.base_url, &username)?;
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps)?;

        tracing::info!("Created Sharenite client for profile {}", profile_url);

        Ok(Self {
            http_handler,
            username,
            profile_url,
        })
    }

    /// Profile root, `…/profiles/<username>`
    pub fn profile_url(&self) -> &Url {
        &self.profile_url
    }

    /// URL of listing page `page`
    pub fn page_url(&self, page: u32) -> FetchResult<Url> {
        let raw = format!("{}/games", self.profile_url.as_str().trim_end_matches('/'));
        let mut url = Url::parse(&raw).map_err(|e| FetchError::InvalidUrl {
            url: raw.clone(),
            error: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("query", "");
        Ok(url)
    }

    /// The underlying HTTP client, shared with the cover provider
    pub fn http_client(&self) -> &reqwest::Client {
        self.http_handler.client()
    }
}

fn profile_url(base_url: &str, username: &str) -> FetchResult<Url> {
    let raw = format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        sharenite::PROFILES_PATH,
        username
    );
    Url::parse(&raw).map_err(|e| FetchError::InvalidUrl {
        url: raw,
        error: e.to_string(),
    })
}

#[async_trait]
impl ListingSource for ShareniteClient {
    async fn fetch_page(&self, page: u32) -> FetchResult<ListingPage> {
        let url = self.page_url(page)?;
        let html = self.http_handler.get_page(&url).await?;
        let listing = parse::parse_listing_page(&html, self.profile_url.as_str(), page)?;
        tracing::debug!(
            "Page {}: found {} games (more: {})",
            page,
            listing.records.len(),
            listing.has_more
        );
        Ok(listing)
    }

    fn profile_name(&self) -> &str {
        &self.username
    }
}

#[async_trait]
impl DetailSource for ShareniteClient {
    async fn fetch_detail(&self, record: &ListingRecord) -> FetchResult<DetailedRecord> {
        let url = Url::parse(&record.url).map_err(|e| FetchError::InvalidUrl {
            url: record.url.clone(),
            error: e.to_string(),
        })?;
        let html = self.http_handler.get_page(&url).await?;
        let details = parse::parse_detail_page(&html)?;
        Ok(DetailedRecord::from_listing(record.clone(), details))
    }
}
