// Triage Controller - operator-facing accept/remove over a live board

use crate::application::session::OperatorSession;
use crate::domain::{CategoryBoard, HistoryRecord, QueueCounts, QueueEntry, ServeOutcome};
use crate::error::{AppError, Result};
use crate::port::{
    EntryFilter, IdProvider, QueueStore, QueueStoreTransaction, Subscription, TimeProvider,
    TransactionalQueueStore,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Live operator view of every entry, grouped by category
pub struct TriageBoard {
    subscription: Subscription<Vec<QueueEntry>>,
    board: CategoryBoard,
    revision: u64,
}

impl TriageBoard {
    /// Current grouping
    pub fn list_by_category(&self) -> &CategoryBoard {
        &self.board
    }

    /// Store revision the grouping was built from
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn counts(&self) -> QueueCounts {
        let entries: Vec<QueueEntry> = self
            .board
            .groups()
            .iter()
            .flat_map(|g| g.entries.iter().cloned())
            .collect();
        QueueCounts::from_snapshot(&entries)
    }

    /// Wait for the next snapshot and regroup it.
    ///
    /// On failure the previous grouping is kept.
    pub async fn changed(&mut self) -> Result<&CategoryBoard> {
        match self.subscription.next().await {
            Ok(snapshot) => {
                self.board = CategoryBoard::from_snapshot(&snapshot.data);
                self.revision = snapshot.revision;
                Ok(&self.board)
            }
            Err(e) => {
                warn!(error = %e, "Board subscription failed, keeping last view");
                Err(e)
            }
        }
    }

    /// Wait until the grouping satisfies `pred`
    pub async fn wait_for<F>(&mut self, pred: F) -> Result<&CategoryBoard>
    where
        F: Fn(&CategoryBoard) -> bool,
    {
        while !pred(&self.board) {
            self.changed().await?;
        }
        Ok(&self.board)
    }
}

/// Triage Controller
pub struct TriageController {
    store: Arc<dyn QueueStore>,
    tx_store: Arc<dyn TransactionalQueueStore>,
    session: Arc<OperatorSession>,
    history_ids: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl TriageController {
    pub fn new(
        store: Arc<dyn QueueStore>,
        tx_store: Arc<dyn TransactionalQueueStore>,
        session: Arc<OperatorSession>,
        history_ids: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            tx_store,
            session,
            history_ids,
            time_provider,
        }
    }

    /// Subscribe to all entries in arrival order
    pub async fn open_board(&self) -> Result<TriageBoard> {
        let mut subscription = self
            .store
            .subscribe(EntryFilter::All)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to open triage board"))?;
        let snapshot = subscription.next().await?;

        Ok(TriageBoard {
            board: CategoryBoard::from_snapshot(&snapshot.data),
            revision: snapshot.revision,
            subscription,
        })
    }

    /// Accept an entry on behalf of the signed-in operator
    pub async fn accept(&self, entry_id: &str) -> Result<ServeOutcome> {
        let operator = self.session.require_operator()?;

        match self.store.mark_served(entry_id, &operator).await {
            Ok(outcome) => {
                info!(entry_id = %entry_id, operator = %operator, ?outcome, "Entry accepted");
                Ok(outcome)
            }
            Err(e) if e.is_user_facing() => {
                warn!(entry_id = %entry_id, operator = %operator, error = %e, "Accept rejected");
                Err(e)
            }
            Err(e) => {
                error!(entry_id = %entry_id, operator = %operator, error = %e, "Accept failed");
                Err(e)
            }
        }
    }

    /// Remove an entry and append its history record.
    ///
    /// The entry is re-read inside the transaction; the removal rule is
    /// checked against that state, and again by the store's delete.
    pub async fn remove(&self, entry: &QueueEntry) -> Result<HistoryRecord> {
        let operator = self.session.require_operator()?;

        let mut tx = self.tx_store.begin_transaction().await?;
        let result = self.remove_in_tx(tx.as_mut(), &entry.id, &operator).await;

        match result {
            Ok(record) => {
                tx.commit()
                    .await
                    .inspect_err(|e| error!(entry_id = %entry.id, error = %e, "Remove commit failed"))?;
                info!(
                    entry_id = %entry.id,
                    operator = %operator,
                    category = %record.category,
                    "Entry removed"
                );
                Ok(record)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Rollback failed");
                }
                warn!(entry_id = %entry.id, operator = %operator, error = %e, "Remove rejected");
                Err(e)
            }
        }
    }

    async fn remove_in_tx(
        &self,
        tx: &mut dyn QueueStoreTransaction,
        entry_id: &str,
        operator: &crate::domain::OperatorId,
    ) -> Result<HistoryRecord> {
        let current = tx
            .find_entry(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Entry {} not found", entry_id)))?;

        current
            .ensure_removable_by(operator)
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        if tx.delete_entry(entry_id, operator).await? == 0 {
            return Err(AppError::Unauthorized(format!(
                "Store refused to remove entry {}",
                entry_id
            )));
        }

        let record = HistoryRecord::from_entry(
            self.history_ids.generate_id(),
            &current,
            self.time_provider.now_millis(),
            operator.clone(),
        );
        tx.append_history(&record).await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OperatorId;
    use crate::port::id_provider::UuidProvider;
    use crate::port::identity::mocks::StaticIdentityGate;
    use crate::port::queue_store::mocks::InMemoryQueueStore;
    use crate::port::time_provider::mocks::ManualClock;
    use std::time::Duration;

    fn controller(store: Arc<InMemoryQueueStore>, username: &str) -> TriageController {
        TriageController::new(
            store.clone(),
            store,
            Arc::new(OperatorSession::new(Arc::new(StaticIdentityGate::signed_in(
                username,
            )))),
            Arc::new(UuidProvider),
            Arc::new(ManualClock::new(50_000, 0)),
        )
    }

    async fn seed(store: &InMemoryQueueStore, id: &str, category: &str, arrived_at: i64) -> QueueEntry {
        let entry = QueueEntry::new(id, format!("name-{}", id), category, arrived_at, "10:00:00");
        store.insert(&entry).await.unwrap();
        entry
    }

    #[tokio::test]
    async fn test_board_groups_live_entries() {
        let store = Arc::new(InMemoryQueueStore::new());
        seed(&store, "a", "Support", 1).await;
        let triage = controller(store.clone(), "desk1");

        let mut board = triage.open_board().await.unwrap();
        assert_eq!(board.list_by_category().len(), 1);

        seed(&store, "b", "Billing", 2).await;
        let view = tokio::time::timeout(Duration::from_secs(2), board.wait_for(|b| b.len() == 2))
            .await
            .unwrap()
            .unwrap();
        let categories: Vec<&str> = view.groups().iter().map(|g| g.category.as_str()).collect();
        assert_eq!(categories, vec!["Support", "Billing"]);
        assert_eq!(board.counts().total(), 2);
    }

    #[tokio::test]
    async fn test_accept_sets_served_by() {
        let store = Arc::new(InMemoryQueueStore::new());
        seed(&store, "a", "Billing", 1).await;
        let triage = controller(store.clone(), "desk1");

        assert_eq!(triage.accept("a").await.unwrap(), ServeOutcome::Accepted);
        let entry = store.find_by_id("a").await.unwrap().unwrap();
        assert!(entry.served);
        assert_eq!(entry.served_by, Some(StaticIdentityGate::operator_id("desk1")));

        assert_eq!(
            triage.accept("a").await.unwrap(),
            ServeOutcome::AlreadyServed
        );
    }

    #[tokio::test]
    async fn test_accept_by_other_operator_rejected() {
        let store = Arc::new(InMemoryQueueStore::new());
        seed(&store, "a", "Billing", 1).await;
        controller(store.clone(), "desk1").accept("a").await.unwrap();

        let err = controller(store.clone(), "desk2")
            .accept("a")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let entry = store.find_by_id("a").await.unwrap().unwrap();
        assert_eq!(entry.served_by, Some(StaticIdentityGate::operator_id("desk1")));
    }

    #[tokio::test]
    async fn test_actions_require_signed_in_operator() {
        let store = Arc::new(InMemoryQueueStore::new());
        let entry = seed(&store, "a", "Billing", 1).await;
        let triage = TriageController::new(
            store.clone(),
            store.clone(),
            Arc::new(OperatorSession::new(Arc::new(StaticIdentityGate::new(&[])))),
            Arc::new(UuidProvider),
            Arc::new(ManualClock::new(0, 0)),
        );

        assert!(matches!(
            triage.accept("a").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            triage.remove(&entry).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(!store.find_by_id("a").await.unwrap().unwrap().served);
    }

    #[tokio::test]
    async fn test_remove_waiting_entry_by_any_operator() {
        let store = Arc::new(InMemoryQueueStore::new());
        let entry = seed(&store, "a", "Billing", 7).await;

        let record = controller(store.clone(), "desk2")
            .remove(&entry)
            .await
            .unwrap();

        assert_eq!(record.name, "name-a");
        assert_eq!(record.category, "Billing");
        assert_eq!(record.arrived_at, 7);
        assert_eq!(record.arrival_display, "10:00:00");
        assert_eq!(record.removed_at, 50_000);
        assert!(store.find_by_id("a").await.unwrap().is_none());
        assert_eq!(store.history().await, vec![record]);
    }

    #[tokio::test]
    async fn test_remove_served_entry_only_by_server() {
        let store = Arc::new(InMemoryQueueStore::new());
        let entry = seed(&store, "a", "Billing", 1).await;
        let owner = controller(store.clone(), "desk1");
        owner.accept("a").await.unwrap();

        let err = controller(store.clone(), "desk2")
            .remove(&entry)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(store.find_by_id("a").await.unwrap().is_some());
        assert!(store.history().await.is_empty());

        let record = owner.remove(&entry).await.unwrap();
        assert_eq!(record.removed_by, OperatorId::new("uid-desk1"));
        assert_eq!(store.history().await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_uses_stored_state_not_caller_copy() {
        let store = Arc::new(InMemoryQueueStore::new());
        let stale = seed(&store, "a", "Billing", 1).await;
        controller(store.clone(), "desk1").accept("a").await.unwrap();

        // caller still holds the not-served copy
        let err = controller(store.clone(), "desk2")
            .remove(&stale)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_remove_unknown_entry() {
        let store = Arc::new(InMemoryQueueStore::new());
        let ghost = QueueEntry::new("ghost00", "G", "Billing", 1, "");

        let err = controller(store.clone(), "desk1")
            .remove(&ghost)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_entry_and_history() {
        let store = Arc::new(InMemoryQueueStore::new());
        let entry = seed(&store, "a", "Billing", 1).await;
        store.set_fail_writes(true);

        let err = controller(store.clone(), "desk1")
            .remove(&entry)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
        assert!(store.find_by_id("a").await.unwrap().is_some());
        assert!(store.history().await.is_empty());
    }
}
