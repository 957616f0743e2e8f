//! Lookup cache statistics

use std::fmt;

/// Point-in-time counts over the lookup cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently held
    pub entries: usize,
    /// Entries pinned by a manual override
    pub manual: usize,
    /// Entries whose resolution has completed
    pub fetched: usize,
    /// Entries that resolved to nothing
    pub negative: usize,
    /// Configured ceiling
    pub capacity: usize,
}

impl CacheStats {
    /// Fill level as a percentage of capacity
    pub fn usage_percentage(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        (self.entries as f64 / self.capacity as f64) * 100.0
    }

    /// Check if the cache is approaching its ceiling
    pub fn is_near_capacity(&self, threshold_percentage: f64) -> bool {
        self.usage_percentage() > threshold_percentage
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} entries ({:.1}%), {} manual, {} fetched, {} without a value",
            self.entries,
            self.capacity,
            self.usage_percentage(),
            self.manual,
            self.fetched,
            self.negative
        )
    }
}
