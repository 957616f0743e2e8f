//! Per-pass synchronization report

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What one synchronization pass did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    /// The pass started from an empty snapshot
    pub initial_load: bool,
    pub pages_fetched: u32,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Records whose detail fetch failed for this pass
    pub skipped: usize,
    /// Paging stopped after a run of unchanged pages
    pub early_terminated: bool,
    /// A page after the first failed and paging stopped there
    pub truncated: bool,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl SyncReport {
    pub fn new(initial_load: bool) -> Self {
        Self {
            started_at: Utc::now(),
            initial_load,
            pages_fetched: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            early_terminated: false,
            truncated: false,
            duration: Duration::ZERO,
        }
    }

    /// Records that were inserted or updated
    pub fn changed(&self) -> usize {
        self.inserted + self.updated
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages in {:.1}s: {} new, {} updated, {} unchanged, {} skipped",
            self.pages_fetched,
            self.duration.as_secs_f64(),
            self.inserted,
            self.updated,
            self.unchanged,
            self.skipped
        )?;
        if self.early_terminated {
            write!(f, " (stopped early)")?;
        }
        if self.truncated {
            write!(f, " (truncated)")?;
        }
        Ok(())
    }
}
