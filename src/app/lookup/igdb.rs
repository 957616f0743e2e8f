//! IGDB cover provider
//!
//! Resolves a game title to a cover (or screenshot) URL through the IGDB
//! search API. Requests are authorized with a Twitch client-credentials token
//! that is cached until shortly before it expires.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::constants::{env, igdb};
use crate::errors::{LookupError, LookupResult};

use super::config::ArtworkKind;
use super::LookupProvider;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    image_id: String,
}

#[derive(Debug, Deserialize)]
struct GameImages {
    #[serde(default)]
    cover: Option<ImageRef>,
    #[serde(default)]
    screenshots: Vec<ImageRef>,
}

/// IGDB-backed [`LookupProvider`]
#[derive(Debug)]
pub struct IgdbProvider {
    client: Client,
    client_id: String,
    client_secret: String,
    artwork: ArtworkKind,
    token: Mutex<Option<CachedToken>>,
}

impl IgdbProvider {
    pub fn new(
        client: Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        artwork: ArtworkKind,
    ) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            artwork,
            token: Mutex::new(None),
        }
    }

    /// Build a provider from `IGDB_CLIENT_ID` / `IGDB_CLIENT_SECRET`
    pub fn from_env(client: Client, artwork: ArtworkKind) -> LookupResult<Self> {
        let missing = || LookupError::MissingCredentials {
            client_id_var: env::IGDB_CLIENT_ID,
            client_secret_var: env::IGDB_CLIENT_SECRET,
        };
        let client_id = std::env::var(env::IGDB_CLIENT_ID).map_err(|_| missing())?;
        let client_secret = std::env::var(env::IGDB_CLIENT_SECRET).map_err(|_| missing())?;
        Ok(Self::new(client, client_id, client_secret, artwork))
    }

    /// Return a valid access token, requesting a new one when needed
    async fn access_token(&self) -> LookupResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.token.clone());
            }
        }

        debug!("Requesting IGDB access token");
        let response = self
            .client
            .post(igdb::TOKEN_URL)
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LookupError::TokenRequest {
                status: response.status().as_u16(),
            });
        }

        let body: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(body.expires_in);
        let token = CachedToken {
            token: body.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(igdb::TOKEN_EXPIRY_MARGIN),
        };
        info!("Obtained IGDB access token valid for {:?}", lifetime);

        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    fn image_for(&self, game: &GameImages) -> Option<String> {
        match self.artwork {
            ArtworkKind::Cover => game
                .cover
                .as_ref()
                .map(|image| image_url(igdb::COVER_SIZE, &image.image_id)),
            ArtworkKind::Screenshot => game
                .screenshots
                .first()
                .map(|image| image_url(igdb::SCREENSHOT_SIZE, &image.image_id)),
        }
    }
}

#[async_trait]
impl LookupProvider for IgdbProvider {
    async fn resolve(&self, key: &str) -> LookupResult<Option<String>> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(igdb::GAMES_URL)
            .header("Client-ID", &self.client_id)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(search_query(key))
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(LookupError::RateLimited),
            status if !status.is_success() => {
                return Err(LookupError::Failed {
                    key: key.to_string(),
                    reason: format!("HTTP {}", status.as_u16()),
                })
            }
            _ => {}
        }

        let games: Vec<GameImages> = response.json().await?;
        let url = games.first().and_then(|game| self.image_for(game));
        debug!("IGDB resolved '{}' to {:?}", key, url);
        Ok(url)
    }
}

/// Apicalypse search body for `title`
fn search_query(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "search \"{}\";\nfields name,cover.image_id,screenshots.image_id;\nwhere cover != null;\nlimit 1;",
        escaped
    )
}

/// CDN URL for an image id at the given size preset
fn image_url(size: &str, image_id: &str) -> String {
    format!("{}/{}/{}.jpg", igdb::IMAGE_BASE_URL, size, image_id)
}
