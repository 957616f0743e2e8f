//! Core HTTP operations with rate limiting
//!
//! Every request waits on a shared `governor` limiter, and server pushback is
//! mapped to typed errors so callers can decide what to retry.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::errors::{FetchError, FetchResult};

/// HTTP operations handler with rate limiting
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the rate is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> FetchResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> FetchResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let rate = NonZeroU32::new(rate_limit_rps)
            .ok_or_else(|| FetchError::Other("Rate limit must be non-zero".to_string()))?;
        Ok(RateLimiter::direct(Quota::per_second(rate)))
    }

    /// Fetches the HTML content of a page
    ///
    /// # Errors
    ///
    /// `RateLimited` on 429, `ServerOverloaded` on 503, `Status` for any other
    /// non-success response and `Http` for transport failures
    pub async fn get_page(&self, url: &Url) -> FetchResult<String> {
        // Jitter keeps concurrent detail fetches from firing in lockstep
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let response = self.client.get(url.as_str()).send().await?;
        check_status(response.status())?;

        let text = response.text().await?;
        tracing::debug!("Successfully fetched page: {}", url);
        Ok(text)
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Map a response status to the matching error
fn check_status(status: StatusCode) -> FetchResult<()> {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            tracing::warn!("Rate limited by server (429)");
            Err(FetchError::RateLimited)
        }
        StatusCode::SERVICE_UNAVAILABLE => {
            tracing::warn!("Server overloaded (503)");
            Err(FetchError::ServerOverloaded)
        }
        status if !status.is_success() => Err(FetchError::Status {
            status: status.as_u16(),
        }),
        _ => Ok(()),
    }
}
