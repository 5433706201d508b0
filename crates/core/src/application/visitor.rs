// Visitor Session - submit once, then follow the queue position

use crate::application::position::PositionTracker;
use crate::application::registration::RegistrationService;
use crate::domain::{EntryId, PositionStatus};
use crate::error::{AppError, Result};
use crate::port::QueueStore;
use std::sync::Arc;
use tracing::warn;

/// One visitor's session: `Idle` until a successful submit, then tracking
/// the returned entry.
pub struct VisitorSession {
    registration: Arc<RegistrationService>,
    tracker: PositionTracker,
    submitted: Option<(EntryId, String)>,
}

impl VisitorSession {
    pub fn new(registration: Arc<RegistrationService>, store: Arc<dyn QueueStore>) -> Self {
        Self {
            registration,
            tracker: PositionTracker::new(store),
            submitted: None,
        }
    }

    /// Submit a registration and start tracking it.
    ///
    /// A rejected submit leaves the current tracking state untouched. Once
    /// the entry is written its id is returned even if tracking cannot
    /// start; that failure is logged, the session shows `Idle`, and
    /// `resume_tracking` retries it.
    pub async fn submit(
        &mut self,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<EntryId> {
        let category = category.into();
        let entry_id = self.registration.submit(name, category.clone()).await?;
        self.submitted = Some((entry_id.clone(), category.clone()));

        if let Err(e) = self.tracker.track(entry_id.clone(), category).await {
            warn!(
                entry_id = %entry_id,
                error = %e,
                "Entry submitted but position tracking did not start"
            );
            self.tracker.stop();
        }
        Ok(entry_id)
    }

    /// Start tracking the submitted entry again, e.g. after a failed
    /// subscription setup.
    pub async fn resume_tracking(&mut self) -> Result<PositionStatus> {
        let Some((entry_id, category)) = self.submitted.clone() else {
            return Err(AppError::Subscription("no entry submitted".to_string()));
        };
        if self.tracker.entry_id() == Some(entry_id.as_str()) {
            return Ok(self.tracker.status());
        }
        self.tracker.track(entry_id, category).await
    }

    /// Id of the last successfully written entry
    pub fn entry_id(&self) -> Option<&str> {
        self.submitted.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn status(&self) -> PositionStatus {
        self.tracker.status()
    }

    pub fn tracker(&mut self) -> &mut PositionTracker {
        &mut self.tracker
    }

    /// End the session, releasing its subscriptions
    pub fn end(&mut self) {
        self.tracker.stop();
        self.submitted = None;
    }
}
