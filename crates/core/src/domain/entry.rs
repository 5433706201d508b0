// Queue Entry Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Entry ID (7-char alphanumeric token)
pub type EntryId = String;

/// Identity of a signed-in operator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorId(String);

impl OperatorId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of accepting an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The entry moved from not-served to served
    Accepted,
    /// The entry was already served by the same operator
    AlreadyServed,
}

/// One visitor's queue registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub name: String,
    pub category: String,

    pub arrived_at: i64,         // epoch ms, used for ordering
    pub arrival_display: String, // HH:MM:SS as shown to the visitor

    pub served: bool,
    pub served_by: Option<OperatorId>,
}

impl QueueEntry {
    /// Create a new, not-yet-served entry
    ///
    /// # Arguments
    ///
    /// * `id` - Unique entry ID (injected, not generated)
    /// * `name` - Visitor display name
    /// * `category` - Service category
    /// * `arrived_at` - Arrival timestamp in epoch ms (injected, not system time)
    /// * `arrival_display` - Formatted arrival time
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        arrived_at: i64,
        arrival_display: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            arrived_at,
            arrival_display: arrival_display.into(),
            served: false,
            served_by: None,
        }
    }

    /// Create a test entry with deterministic ID and arrival time.
    ///
    /// IDs are `t000001`, `t000002`, ... and arrival times start at 1000 and
    /// increment by 1000, so entries created later always sort later.
    ///
    /// **Note**: Only for tests. Production code injects ID and time via providers.
    pub fn new_test(name: impl Into<String>, category: impl Into<String>) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        Self::new(
            format!("t{:06}", counter),
            name,
            category,
            (counter * 1000) as i64,
            "00:00:00",
        )
    }

    /// Mark the entry as served by `operator`
    pub fn accept(&mut self, operator: &OperatorId) -> Result<ServeOutcome> {
        if !self.served {
            self.served = true;
            self.served_by = Some(operator.clone());
            return Ok(ServeOutcome::Accepted);
        }
        match &self.served_by {
            Some(current) if current == operator => Ok(ServeOutcome::AlreadyServed),
            current => Err(DomainError::AlreadyServed {
                id: self.id.clone(),
                served_by: describe_operator(current.as_ref()),
            }),
        }
    }

    /// Removal guard: any operator for a waiting entry, only the serving
    /// operator once served
    pub fn can_be_removed_by(&self, operator: &OperatorId) -> bool {
        !self.served || self.served_by.as_ref() == Some(operator)
    }

    pub fn ensure_removable_by(&self, operator: &OperatorId) -> Result<()> {
        if self.can_be_removed_by(operator) {
            return Ok(());
        }
        Err(DomainError::RemovalForbidden {
            id: self.id.clone(),
            operator: operator.to_string(),
            served_by: describe_operator(self.served_by.as_ref()),
        })
    }

    /// Arrival order: arrival time, then id as tie-breaker
    pub fn arrival_cmp(&self, other: &Self) -> Ordering {
        self.arrived_at
            .cmp(&other.arrived_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

fn describe_operator(operator: Option<&OperatorId>) -> String {
    operator
        .map(|o| o.to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Audit entry appended when a queue entry is removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub arrived_at: i64,
    pub arrival_display: String,
    pub removed_at: i64,
    pub removed_by: OperatorId,
}

impl HistoryRecord {
    pub fn from_entry(
        id: impl Into<String>,
        entry: &QueueEntry,
        removed_at: i64,
        removed_by: OperatorId,
    ) -> Self {
        Self {
            id: id.into(),
            name: entry.name.clone(),
            category: entry.category.clone(),
            arrived_at: entry.arrived_at,
            arrival_display: entry.arrival_display.clone(),
            removed_at,
            removed_by,
        }
    }
}
