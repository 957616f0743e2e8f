//! Lookup provider configuration

use serde::{Deserialize, Serialize};

use crate::app::retry::RetryPolicy;

/// Which image a cover lookup returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtworkKind {
    #[default]
    Cover,
    Screenshot,
}

/// Configuration for cover lookups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Image type requested from the provider
    pub artwork: ArtworkKind,
    /// Retry schedule for transient provider failures
    pub retry: RetryPolicy,
}

impl LookupConfig {
    /// Request a different image type
    pub fn with_artwork(mut self, artwork: ArtworkKind) -> Self {
        self.artwork = artwork;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.retry.validate()
    }
}
