// Live position tracking for one visitor session

use crate::domain::{EntryId, PositionStatus, QueueCounts, QueueEntry};
use crate::error::{AppError, Result};
use crate::port::{EntryFilter, QueueStore, Snapshot, Subscription};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tracks one visitor's entry through two independent subscriptions:
/// all waiting entries (for counts and rank) and the entry itself (for the
/// served transition).
///
/// Subscriptions live exactly as long as the tracking state. `track` on a
/// new id, `stop`, and dropping the tracker all release them.
pub struct PositionTracker {
    store: Arc<dyn QueueStore>,
    state: TrackerState,
}

enum TrackerState {
    Idle,
    Tracking(Tracking),
}

struct Tracking {
    entry_id: EntryId,
    category: String,
    waiting: Subscription<Vec<QueueEntry>>,
    own: Subscription<Option<QueueEntry>>,
    waiting_snapshot: Snapshot<Vec<QueueEntry>>,
    own_snapshot: Snapshot<Option<QueueEntry>>,
    status: PositionStatus,
}

impl Tracking {
    /// Re-derive the status; false while the two snapshots disagree, in
    /// which case the previous status is kept.
    fn recompute(&mut self) -> bool {
        match PositionStatus::derive(
            &self.entry_id,
            &self.category,
            self.own_snapshot.data.as_ref(),
            self.own_snapshot.revision,
            &self.waiting_snapshot.data,
            self.waiting_snapshot.revision,
        ) {
            Some(status) => {
                self.status = status;
                true
            }
            None => false,
        }
    }
}

enum Update {
    Waiting(Result<Snapshot<Vec<QueueEntry>>>),
    Own(Result<Snapshot<Option<QueueEntry>>>),
}

impl PositionTracker {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self {
            store,
            state: TrackerState::Idle,
        }
    }

    /// Start tracking `entry_id`, replacing any previous tracking state.
    ///
    /// Returns once both subscriptions delivered their initial snapshot. If
    /// either subscription cannot be opened the previous state is kept.
    pub async fn track(
        &mut self,
        entry_id: impl Into<EntryId>,
        category: impl Into<String>,
    ) -> Result<PositionStatus> {
        let entry_id = entry_id.into();
        let category = category.into();

        let mut waiting = self.store.subscribe(EntryFilter::Waiting).await?;
        let mut own = self.store.watch_entry(&entry_id).await?;
        let waiting_snapshot = waiting.next().await?;
        let own_snapshot = own.next().await?;

        let mut tracking = Tracking {
            entry_id,
            category,
            waiting,
            own,
            waiting_snapshot,
            own_snapshot,
            status: PositionStatus::Idle,
        };
        while !tracking.recompute() {
            tracking.own_snapshot = tracking.own.next().await?;
        }

        self.stop();
        info!(
            entry_id = %tracking.entry_id,
            category = %tracking.category,
            status = ?tracking.status,
            "Tracking queue position"
        );
        let status = tracking.status.clone();
        self.state = TrackerState::Tracking(tracking);
        Ok(status)
    }

    /// Stop tracking and release both subscriptions
    pub fn stop(&mut self) {
        if let TrackerState::Tracking(tracking) = &self.state {
            debug!(entry_id = %tracking.entry_id, "Stopped tracking");
        }
        self.state = TrackerState::Idle;
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, TrackerState::Tracking(_))
    }

    pub fn entry_id(&self) -> Option<&str> {
        match &self.state {
            TrackerState::Tracking(t) => Some(&t.entry_id),
            TrackerState::Idle => None,
        }
    }

    /// Last derived status
    pub fn status(&self) -> PositionStatus {
        match &self.state {
            TrackerState::Tracking(t) => t.status.clone(),
            TrackerState::Idle => PositionStatus::Idle,
        }
    }

    /// Per-category waiting counts from the latest waiting snapshot
    pub fn counts(&self) -> QueueCounts {
        match &self.state {
            TrackerState::Tracking(t) => QueueCounts::from_snapshot(&t.waiting_snapshot.data),
            TrackerState::Idle => QueueCounts::default(),
        }
    }

    /// Wait for the next snapshot from either subscription and re-derive.
    ///
    /// # Errors
    /// - AppError::Subscription if not tracking or a subscription closed.
    ///   The last-known status stays available through `status()`.
    pub async fn changed(&mut self) -> Result<PositionStatus> {
        let TrackerState::Tracking(tracking) = &mut self.state else {
            return Err(AppError::Subscription("not tracking any entry".to_string()));
        };

        let update = tokio::select! {
            snapshot = tracking.waiting.next() => Update::Waiting(snapshot),
            snapshot = tracking.own.next() => Update::Own(snapshot),
        };

        let result = match update {
            Update::Waiting(snapshot) => snapshot.map(|s| tracking.waiting_snapshot = s),
            Update::Own(snapshot) => snapshot.map(|s| tracking.own_snapshot = s),
        };
        if let Err(e) = result {
            warn!(
                entry_id = %tracking.entry_id,
                error = %e,
                "Position subscription failed, keeping last status"
            );
            return Err(e);
        }

        let previous = tracking.status.clone();
        if !tracking.recompute() {
            debug!(
                entry_id = %tracking.entry_id,
                waiting_revision = tracking.waiting_snapshot.revision,
                own_revision = tracking.own_snapshot.revision,
                "Entry snapshot behind waiting snapshot, keeping last status"
            );
        } else if tracking.status != previous {
            debug!(
                entry_id = %tracking.entry_id,
                status = ?tracking.status,
                "Queue position changed"
            );
        }
        Ok(tracking.status.clone())
    }

    /// Wait until the derived status satisfies `pred`
    pub async fn wait_for<F>(&mut self, pred: F) -> Result<PositionStatus>
    where
        F: Fn(&PositionStatus) -> bool,
    {
        let mut status = self.status();
        while !pred(&status) {
            status = self.changed().await?;
        }
        Ok(status)
    }
}
