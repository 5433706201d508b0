// Queue position derivation
//
// Everything here is recomputed from one complete snapshot. Nothing is
// patched incrementally.

use crate::domain::entry::QueueEntry;
use serde::Serialize;
use std::collections::BTreeMap;

/// Not-served entry counts per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    counts: BTreeMap<String, usize>,
}

impl QueueCounts {
    /// Count not-served entries per category. Served entries in the snapshot
    /// are ignored, so the same function works for filtered and full snapshots.
    pub fn from_snapshot(entries: &[QueueEntry]) -> Self {
        let mut counts = BTreeMap::new();
        for entry in entries.iter().filter(|e| !e.served) {
            *counts.entry(entry.category.clone()).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn get(&self, category: &str) -> usize {
        self.counts.get(category).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// What the visitor sees about their own entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PositionStatus {
    /// No submission yet
    Idle,
    /// Still waiting. `position` 1 means "you are next".
    Waiting {
        position: usize,
        category_count: usize,
    },
    /// An operator accepted the entry
    YourTurn,
    /// The entry no longer exists in the store
    Dismissed,
}

impl PositionStatus {
    /// Derive the visitor's status from the latest snapshot of each
    /// subscription.
    ///
    /// * `own` - the visitor's entry (`None` = deleted) as of `own_revision`
    /// * `waiting` - not-served entries as of `waiting_revision`
    ///
    /// Returns `None` while the two snapshots disagree: the entry has left
    /// the waiting snapshot but the own-entry snapshot is older and does not
    /// show why yet. Callers keep their previous status until it catches up.
    pub fn derive(
        entry_id: &str,
        category: &str,
        own: Option<&QueueEntry>,
        own_revision: u64,
        waiting: &[QueueEntry],
        waiting_revision: u64,
    ) -> Option<Self> {
        let own = match own {
            Some(entry) if entry.served => return Some(PositionStatus::YourTurn),
            Some(entry) => entry,
            None => return Some(PositionStatus::Dismissed),
        };

        let mut in_category: Vec<&QueueEntry> = waiting
            .iter()
            .filter(|e| !e.served && e.category == category)
            .collect();

        if !in_category.iter().any(|e| e.id == entry_id) {
            // Only a waiting snapshot that predates the insert may lack the entry
            if own_revision < waiting_revision {
                return None;
            }
            in_category.push(own);
        }
        in_category.sort_by(|a, b| a.arrival_cmp(b));

        let rank = in_category
            .iter()
            .position(|e| e.id == entry_id)
            .map(|idx| idx + 1)
            .unwrap_or(in_category.len());

        Some(PositionStatus::Waiting {
            position: rank,
            category_count: in_category.len(),
        })
    }

    pub fn is_your_turn(&self) -> bool {
        matches!(self, PositionStatus::YourTurn)
    }

    /// Visitor-facing message
    pub fn message(&self) -> String {
        match self {
            PositionStatus::Idle => "Please submit the form to see your position.".to_string(),
            PositionStatus::Waiting { position: 1, .. } => "You are next".to_string(),
            PositionStatus::Waiting { position, .. } => {
                format!("Your current position in the queue: {}", position)
            }
            PositionStatus::YourTurn => "Your turn".to_string(),
            PositionStatus::Dismissed => "Your entry has been closed".to_string(),
        }
    }
}
