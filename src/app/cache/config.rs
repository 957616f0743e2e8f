//! Lookup cache configuration types and defaults
//!
//! This module contains the configuration structures for the bounded lookup
//! cache, including default values and validation logic.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::covers;

/// Configuration for the bounded lookup cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries kept
    pub capacity: usize,
    /// Age after which unprotected entries expire (None disables expiry)
    #[serde(with = "humantime_serde")]
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: covers::DEFAULT_CAPACITY,
            ttl: Some(covers::DEFAULT_TTL),
        }
    }
}

impl CacheConfig {
    /// Set the entry ceiling
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set or disable the expiry of unprotected entries
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("Cache capacity cannot be zero".to_string());
        }

        if matches!(self.ttl, Some(ttl) if ttl.is_zero()) {
            return Err("Cache TTL cannot be zero; omit it to disable expiry".to_string());
        }

        Ok(())
    }
}
