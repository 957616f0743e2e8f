//! Working snapshot with identity-based merging

use std::collections::HashMap;

use crate::app::models::{DetailedRecord, Profile, Snapshot};

/// Result of merging one fetched record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// The snapshot being built by a pass, indexed by identifier
///
/// Subscribers borrow the held snapshot directly, so notifying after every
/// insert does not copy the records.
#[derive(Debug, Default)]
pub struct WorkingSnapshot {
    snapshot: Snapshot,
    index: HashMap<String, usize>,
}

impl WorkingSnapshot {
    /// Start from existing records; duplicate identifiers collapse
    pub fn from_records(records: Vec<DetailedRecord>) -> Self {
        let mut working = Self::default();
        for record in records {
            match working.index.get(record.id()) {
                Some(&position) => working.snapshot.records[position] = record,
                None => working.push(record),
            }
        }
        working
    }

    fn push(&mut self, record: DetailedRecord) {
        self.index
            .insert(record.id().to_string(), self.snapshot.records.len());
        self.snapshot.records.push(record);
    }

    /// Merge a freshly fetched record
    ///
    /// A known record is replaced only when its remote activity changed, and
    /// the replacement keeps the stored preference flags.
    pub fn merge(&mut self, fetched: DetailedRecord) -> MergeOutcome {
        match self.index.get(fetched.id()) {
            Some(&position) => {
                let current = &self.snapshot.records[position];
                if !current.differs_remotely(&fetched) {
                    return MergeOutcome::Unchanged;
                }
                let replacement = fetched.with_preferences_of(current);
                self.snapshot.records[position] = replacement;
                MergeOutcome::Updated
            }
            None => {
                self.push(fetched);
                MergeOutcome::Inserted
            }
        }
    }

    pub fn set_profile(&mut self, profile: Option<Profile>) {
        self.snapshot.profile = profile;
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.snapshot.profile.as_ref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.snapshot.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.records.is_empty()
    }

    /// Borrow the current state
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Owned copy of the current state, for writers that outlive the borrow
    pub fn to_snapshot(&self) -> Snapshot {
        self.snapshot.clone()
    }

    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }
}
