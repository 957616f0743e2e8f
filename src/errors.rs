//! Error types for Sharenite Mirror
//!
//! This module defines the error types for every component of the library.
//! Only [`SyncError::SourceUnavailable`] is ever surfaced to a synchronization
//! caller; detail, lookup and persistence failures are absorbed by the engines
//! and reflected only in which data is present.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while talking to the remote listing or detail source
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server error: HTTP {status}")]
    Status { status: u16 },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimited,

    /// Server overloaded
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Invalid URL built for a request
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// The page could not be interpreted
    #[error("Failed to parse page: {reason}")]
    Parse { reason: String },

    /// A record's detail could not be fetched within the retry budget
    #[error("Detail fetch failed for record {id} after {attempts} attempts")]
    DetailFetchFailed { id: String, attempts: u32 },

    /// Generic error for other issues
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Check whether retrying the request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Http(_) | FetchError::RateLimited | FetchError::ServerOverloaded
        ) || matches!(self, FetchError::Status { status } if *status >= 500)
    }
}

/// Errors surfaced by the library synchronization engine
#[derive(Error, Debug)]
pub enum SyncError {
    /// The first listing page could not be fetched
    #[error("Library source unavailable (page {page}): {reason}")]
    SourceUnavailable { page: u32, reason: String },

    /// A synchronization pass is already running on this engine
    #[error("A synchronization pass is already in progress")]
    AlreadyInProgress,
}

/// Lookup provider errors
#[derive(Error, Debug)]
pub enum LookupError {
    /// HTTP request failed
    #[error("Lookup HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Provider asked us to slow down
    #[error("Lookup provider rate limit exceeded")]
    RateLimited,

    /// Provider credentials were not configured
    #[error("Missing lookup credentials. Set {client_id_var} and {client_secret_var}")]
    MissingCredentials {
        client_id_var: &'static str,
        client_secret_var: &'static str,
    },

    /// Access token could not be obtained
    #[error("Token request failed: HTTP {status}")]
    TokenRequest { status: u16 },

    /// The lookup failed for any other reason
    #[error("Lookup failed for '{key}': {reason}")]
    Failed { key: String, reason: String },
}

impl LookupError {
    /// Transient failures are retried with linear backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, LookupError::RateLimited | LookupError::Http(_))
    }
}

/// Persistent key-value store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error while reading or writing a namespace
    #[error("Store I/O error")]
    Io(#[from] std::io::Error),

    /// Stored blob could not be (de)serialized
    #[error("Store serialization error")]
    Serialization(#[from] serde_json::Error),

    /// Store directory not found or inaccessible
    #[error("Store directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// Writing a namespace failed
    #[error("Failed to persist namespace '{namespace}': {reason}")]
    PersistFailure { namespace: String, reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Configuration could not be read
    #[error("Failed to read configuration file")]
    Io(#[from] std::io::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Remote source error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Synchronization error
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Lookup error
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Fetch(e) => e.is_transient(),
            AppError::Lookup(e) => e.is_transient(),
            AppError::Sync(SyncError::AlreadyInProgress) => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Fetch(_) => "fetch",
            AppError::Sync(_) => "sync",
            AppError::Lookup(_) => "lookup",
            AppError::Store(_) => "store",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }

    /// Message shown to CLI users, with a retry hint for transient failures
    pub fn report(&self) -> String {
        let mut message = format!("Error ({}): {}", self.category(), self);
        if self.is_recoverable() {
            message.push_str("\nThis looks temporary; running the command again may succeed.");
        }
        message
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Remote source result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Synchronization result type alias
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Lookup result type alias
pub type LookupResult<T> = std::result::Result<T, LookupError>;

/// Store result type alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;
