//! Data models for the mirrored game library
//!
//! A [`ListingRecord`] is what one row of a remote library page yields. The
//! detail source turns it into a [`DetailedRecord`], and the engine keeps those
//! in a [`Snapshot`], the local mirror of the whole collection.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::sync;

/// One row of a remote library page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Identifier, unique within the collection
    pub id: String,
    /// Game title
    pub title: String,
    /// Human readable last activity ("3 days ago")
    pub last_activity: String,
    /// ISO-8601 timestamp of the last activity, or empty
    #[serde(default)]
    pub last_activity_date: String,
    /// Where the record's detail lives
    pub url: String,
}

impl ListingRecord {
    /// Create a listing record
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        last_activity: impl Into<String>,
        last_activity_date: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            last_activity: last_activity.into(),
            last_activity_date: last_activity_date.into(),
            url: url.into(),
        }
    }
}

/// One page of the remote listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub records: Vec<ListingRecord>,
    /// Whether a further page exists
    pub has_more: bool,
    /// Library size, when the page advertises it
    pub total_games: Option<u64>,
}

impl ListingPage {
    pub fn new(records: Vec<ListingRecord>, has_more: bool) -> Self {
        Self {
            records,
            has_more,
            total_games: None,
        }
    }

    pub fn with_total_games(mut self, total_games: u64) -> Self {
        self.total_games = Some(total_games);
        self
    }
}

/// Attributes scraped from a record's detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDetails {
    pub play_time: Option<String>,
    pub play_count: Option<u32>,
    pub platform: Option<String>,
    pub added: Option<String>,
    pub modified: Option<String>,
}

/// A listing record enriched with its detail attributes
///
/// Two detailed records with the same `id` are the same game; remote data
/// replaces everything except the locally owned `favorite` and `completed`
/// flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedRecord {
    #[serde(flatten)]
    pub listing: ListingRecord,
    /// Total play time as `HH:MM:SS`; `00:00:00` means never played
    pub play_time: String,
    #[serde(default)]
    pub play_count: u32,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub added: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub is_custom_game: bool,
    #[serde(default)]
    pub is_installed: bool,
    #[serde(default)]
    pub is_installing: bool,
    #[serde(default)]
    pub is_launching: bool,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub is_uninstalling: bool,
    #[serde(default)]
    pub user_score: Option<String>,
    #[serde(default)]
    pub community_score: Option<String>,
    #[serde(default)]
    pub critic_score: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Locally owned, never taken from the remote
    #[serde(default)]
    pub favorite: bool,
    /// Locally owned, never taken from the remote
    #[serde(default)]
    pub completed: bool,
}

impl DetailedRecord {
    /// Combine a listing row with its scraped details, filling defaults
    pub fn from_listing(listing: ListingRecord, details: RecordDetails) -> Self {
        Self {
            listing,
            play_time: details
                .play_time
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| sync::NEVER_PLAYED.to_string()),
            play_count: details.play_count.unwrap_or(0),
            platform: details.platform,
            added: details.added,
            modified: details.modified,
            is_custom_game: false,
            is_installed: false,
            is_installing: false,
            is_launching: false,
            is_running: false,
            is_uninstalling: false,
            user_score: None,
            community_score: None,
            critic_score: None,
            version: None,
            notes: None,
            favorite: false,
            completed: false,
        }
    }

    /// Record identifier
    pub fn id(&self) -> &str {
        &self.listing.id
    }

    /// Record title
    pub fn title(&self) -> &str {
        &self.listing.title
    }

    /// Whether the record has ever been played
    pub fn has_been_played(&self) -> bool {
        self.play_time != sync::NEVER_PLAYED
    }

    /// Compare the fields that signal remote activity
    pub fn differs_remotely(&self, other: &DetailedRecord) -> bool {
        self.play_time != other.play_time
            || self.listing.last_activity_date != other.listing.last_activity_date
            || self.play_count != other.play_count
    }

    /// Carry the local preference flags over from an older copy
    pub fn with_preferences_of(mut self, previous: &DetailedRecord) -> Self {
        self.favorite = previous.favorite;
        self.completed = previous.completed;
        self
    }
}

/// Summary of the remote profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub total_games: u64,
    /// Timestamp label of the most recent activity
    pub last_updated: String,
}

/// The local mirror of the remote collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub records: Vec<DetailedRecord>,
    /// Time of the last successful full or partial write
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl Snapshot {
    /// Build a snapshot from records, keeping identifiers unique
    pub fn from_records(records: Vec<DetailedRecord>) -> Self {
        let mut snapshot = Self {
            records,
            ..Default::default()
        };
        snapshot.dedup();
        snapshot
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find a record by identifier
    pub fn get(&self, id: &str) -> Option<&DetailedRecord> {
        self.records.iter().find(|record| record.id() == id)
    }

    /// Find a record by identifier for in-place edits
    pub fn get_mut(&mut self, id: &str) -> Option<&mut DetailedRecord> {
        self.records.iter_mut().find(|record| record.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Collapse duplicate identifiers; the later copy wins and keeps the
    /// position of the first occurrence.
    pub fn dedup(&mut self) {
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(self.records.len());
        let mut unique: Vec<DetailedRecord> = Vec::with_capacity(self.records.len());

        for record in self.records.drain(..) {
            match positions.get(record.id()) {
                Some(&index) => unique[index] = record,
                None => {
                    positions.insert(record.id().to_string(), unique.len());
                    unique.push(record);
                }
            }
        }

        self.records = unique;
    }

    /// Merge records by identifier; incoming copies replace stored ones
    pub fn merge_records(&mut self, incoming: &[DetailedRecord]) {
        let mut positions: HashMap<String, usize> = self
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.id().to_string(), index))
            .collect();

        for record in incoming {
            match positions.get(record.id()) {
                Some(&index) => self.records[index] = record.clone(),
                None => {
                    positions.insert(record.id().to_string(), self.records.len());
                    self.records.push(record.clone());
                }
            }
        }
    }

    /// Whether the snapshot is older than `window` at `now`
    ///
    /// A snapshot that was never written counts as stale.
    pub fn is_stale(&self, window: Duration, now: DateTime<Utc>) -> bool {
        match self.updated_at {
            Some(updated_at) => match (now - updated_at).to_std() {
                Ok(age) => age > window,
                // Written "in the future" (clock skew): treat as fresh
                Err(_) => false,
            },
            None => true,
        }
    }
}
