//! Locally owned per-game preferences
//!
//! Favorite and completed flags are set by the user, never by the remote. They
//! live in their own store namespace and are overlaid onto every snapshot the
//! engine hands out, so a sync pass can replace remote fields freely.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::models::{DetailedRecord, Snapshot};
use crate::app::store::JsonStore;
use crate::constants::store;
use crate::errors::StoreResult;

/// Flags stored for one game; unset fields leave the record alone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl GamePreferences {
    /// Merge an update over these preferences
    pub fn merged(self, update: GamePreferences) -> Self {
        Self {
            favorite: update.favorite.or(self.favorite),
            completed: update.completed.or(self.completed),
        }
    }

    /// Write the set flags onto a record
    pub fn apply_to(&self, record: &mut DetailedRecord) {
        if let Some(favorite) = self.favorite {
            record.favorite = favorite;
        }
        if let Some(completed) = self.completed {
            record.completed = completed;
        }
    }
}

/// Preferences keyed by record identifier
pub type PreferenceMap = HashMap<String, GamePreferences>;

/// Overlay every known preference onto `records`
pub fn apply_preferences(records: &mut [DetailedRecord], preferences: &PreferenceMap) {
    if preferences.is_empty() {
        return;
    }
    for record in records.iter_mut() {
        if let Some(prefs) = preferences.get(record.id()) {
            prefs.apply_to(record);
        }
    }
}

/// Store-backed preference overlay
#[derive(Debug, Clone)]
pub struct PreferenceOverlay {
    store: JsonStore,
}

impl PreferenceOverlay {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    /// Load every stored preference
    pub fn load(&self) -> PreferenceMap {
        self.store
            .load(store::PREFERENCES_KEY)
            .unwrap_or_default()
    }

    /// Preferences stored for one record
    pub fn get(&self, id: &str) -> Option<GamePreferences> {
        self.load().get(id).copied()
    }

    /// Merge `update` into the stored preferences for `id`
    ///
    /// Re-reads the namespace before writing so concurrent writers to other
    /// records are not lost.
    pub fn update(&self, id: &str, update: GamePreferences) -> StoreResult<GamePreferences> {
        let mut preferences = self.load();
        let merged = preferences
            .get(id)
            .copied()
            .unwrap_or_default()
            .merged(update);
        preferences.insert(id.to_string(), merged);
        self.store.save(store::PREFERENCES_KEY, &preferences)?;

        debug!("Updated preferences for {}: {:?}", id, merged);
        Ok(merged)
    }

    /// Merge `update` for `id` and rewrite the stored snapshot's copy
    ///
    /// The snapshot is only rewritten when it holds the record.
    pub fn set(&self, id: &str, update: GamePreferences) -> StoreResult<GamePreferences> {
        let merged = self.update(id, update)?;

        let stored: Option<Snapshot> = self.store.load(store::SNAPSHOT_KEY);
        if let Some(mut snapshot) = stored {
            if let Some(record) = snapshot.get_mut(id) {
                merged.apply_to(record);
                self.store.save(store::SNAPSHOT_KEY, &snapshot)?;
            }
        }

        Ok(merged)
    }

    /// Overlay stored preferences onto a snapshot
    pub fn apply(&self, snapshot: &mut Snapshot) {
        apply_preferences(&mut snapshot.records, &self.load());
    }
}
