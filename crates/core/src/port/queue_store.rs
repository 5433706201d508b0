// Queue Store Port (Interface)

use crate::domain::{OperatorId, QueueEntry, ServeOutcome};
use crate::error::Result;
use crate::port::subscription::Subscription;
use async_trait::async_trait;

/// Which entries a query or subscription covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFilter {
    /// Every live entry
    All,
    /// Entries not yet served
    Waiting,
}

impl EntryFilter {
    pub fn matches(&self, entry: &QueueEntry) -> bool {
        match self {
            EntryFilter::All => true,
            EntryFilter::Waiting => !entry.served,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryFilter::All => "all",
            EntryFilter::Waiting => "waiting",
        }
    }
}

/// Repository interface for queue entries.
///
/// Lists and snapshots are always in arrival order (`arrived_at`, then id).
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Insert a new entry
    ///
    /// # Errors
    /// - AppError::Conflict if an entry with the same id exists
    async fn insert(&self, entry: &QueueEntry) -> Result<()>;

    /// Find entry by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<QueueEntry>>;

    /// One-shot read of matching entries
    async fn list(&self, filter: EntryFilter) -> Result<Vec<QueueEntry>>;

    /// Mark an entry served by `operator` (conditional update)
    ///
    /// # Errors
    /// - AppError::NotFound if the entry does not exist
    /// - AppError::Conflict if another operator already served it
    async fn mark_served(&self, id: &str, operator: &OperatorId) -> Result<ServeOutcome>;

    /// Live snapshots of matching entries
    async fn subscribe(&self, filter: EntryFilter) -> Result<Subscription<Vec<QueueEntry>>>;

    /// Live snapshots of a single entry (`None` once it is deleted)
    async fn watch_entry(&self, id: &str) -> Result<Subscription<Option<QueueEntry>>>;
}

// ============================================================================
// In-memory implementation for testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{DomainError, HistoryRecord};
    use crate::error::AppError;
    use crate::port::subscription::spawn_snapshot_feed;
    use crate::port::transaction::{QueueStoreTransaction, Transaction, TransactionalQueueStore};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::{watch, Mutex, OwnedMutexGuard};

    #[derive(Debug, Clone, Default)]
    struct MemoryState {
        entries: Vec<QueueEntry>,
        history: Vec<HistoryRecord>,
    }

    impl MemoryState {
        fn select(&self, filter: EntryFilter) -> Vec<QueueEntry> {
            let mut selected: Vec<QueueEntry> = self
                .entries
                .iter()
                .filter(|e| filter.matches(e))
                .cloned()
                .collect();
            selected.sort_by(|a, b| a.arrival_cmp(b));
            selected
        }

        fn find(&self, id: &str) -> Option<QueueEntry> {
            self.entries.iter().find(|e| e.id == id).cloned()
        }
    }

    /// In-memory QueueStore with live subscriptions.
    ///
    /// `set_fail_writes(true)` makes every write fail with
    /// `AppError::Database` without changing state.
    /// `set_fail_subscriptions(true)` makes opening a subscription fail with
    /// `AppError::Subscription`.
    pub struct InMemoryQueueStore {
        state: Arc<Mutex<MemoryState>>,
        changes: Arc<watch::Sender<u64>>,
        fail_writes: Arc<AtomicBool>,
        fail_subscriptions: AtomicBool,
    }

    impl Default for InMemoryQueueStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl InMemoryQueueStore {
        pub fn new() -> Self {
            let (changes, _) = watch::channel(0);
            Self {
                state: Arc::new(Mutex::new(MemoryState::default())),
                changes: Arc::new(changes),
                fail_writes: Arc::new(AtomicBool::new(false)),
                fail_subscriptions: AtomicBool::new(false),
            }
        }

        pub fn set_fail_subscriptions(&self, fail: bool) {
            self.fail_subscriptions.store(fail, Ordering::SeqCst);
        }

        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Current store revision
        pub fn revision(&self) -> u64 {
            *self.changes.borrow()
        }

        /// Number of open subscriptions
        pub fn subscriber_count(&self) -> usize {
            self.changes.receiver_count()
        }

        /// Appended history records (test inspection only)
        pub async fn history(&self) -> Vec<HistoryRecord> {
            self.state.lock().await.history.clone()
        }

        fn check_writable(&self) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::Database("store unavailable".to_string()));
            }
            Ok(())
        }

        fn check_subscribable(&self) -> Result<()> {
            if self.fail_subscriptions.load(Ordering::SeqCst) {
                return Err(AppError::Subscription("setup failed".to_string()));
            }
            Ok(())
        }

        fn notify(&self) {
            self.changes.send_modify(|rev| *rev += 1);
        }
    }

    #[async_trait]
    impl QueueStore for InMemoryQueueStore {
        async fn insert(&self, entry: &QueueEntry) -> Result<()> {
            self.check_writable()?;
            {
                let mut state = self.state.lock().await;
                if state.entries.iter().any(|e| e.id == entry.id) {
                    return Err(AppError::Conflict(format!(
                        "Entry {} already exists",
                        entry.id
                    )));
                }
                state.entries.push(entry.clone());
            }
            self.notify();
            Ok(())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<QueueEntry>> {
            Ok(self.state.lock().await.find(id))
        }

        async fn list(&self, filter: EntryFilter) -> Result<Vec<QueueEntry>> {
            Ok(self.state.lock().await.select(filter))
        }

        async fn mark_served(&self, id: &str, operator: &OperatorId) -> Result<ServeOutcome> {
            self.check_writable()?;
            let outcome = {
                let mut state = self.state.lock().await;
                let entry = state
                    .entries
                    .iter_mut()
                    .find(|e| e.id == id)
                    .ok_or_else(|| AppError::NotFound(format!("Entry {} not found", id)))?;
                entry.accept(operator).map_err(|e| match e {
                    DomainError::AlreadyServed { .. } => AppError::Conflict(e.to_string()),
                    other => AppError::Domain(other),
                })?
            };
            if outcome == ServeOutcome::Accepted {
                self.notify();
            }
            Ok(outcome)
        }

        async fn subscribe(&self, filter: EntryFilter) -> Result<Subscription<Vec<QueueEntry>>> {
            self.check_subscribable()?;
            let state = Arc::clone(&self.state);
            spawn_snapshot_feed(
                format!("memory:{}", filter.as_str()),
                self.changes.subscribe(),
                move || {
                    let state = Arc::clone(&state);
                    async move { Ok(state.lock().await.select(filter)) }
                },
            )
            .await
        }

        async fn watch_entry(&self, id: &str) -> Result<Subscription<Option<QueueEntry>>> {
            self.check_subscribable()?;
            let state = Arc::clone(&self.state);
            let id = id.to_string();
            spawn_snapshot_feed(
                format!("memory:entry:{}", id),
                self.changes.subscribe(),
                move || {
                    let state = Arc::clone(&state);
                    let id = id.clone();
                    async move { Ok(state.lock().await.find(&id)) }
                },
            )
            .await
        }
    }

    #[async_trait]
    impl TransactionalQueueStore for InMemoryQueueStore {
        async fn begin_transaction(&self) -> Result<Box<dyn QueueStoreTransaction>> {
            let guard = Arc::clone(&self.state).lock_owned().await;
            let backup = guard.clone();
            Ok(Box::new(MemoryTransaction {
                guard,
                backup,
                changes: Arc::clone(&self.changes),
                fail_writes: Arc::clone(&self.fail_writes),
                dirty: false,
                finished: false,
            }))
        }
    }

    /// Holds the store lock for its whole lifetime. Dropped without commit,
    /// it restores the state it started from.
    pub struct MemoryTransaction {
        guard: OwnedMutexGuard<MemoryState>,
        backup: MemoryState,
        changes: Arc<watch::Sender<u64>>,
        fail_writes: Arc<AtomicBool>,
        dirty: bool,
        finished: bool,
    }

    impl Drop for MemoryTransaction {
        fn drop(&mut self) {
            if !self.finished {
                *self.guard = self.backup.clone();
            }
        }
    }

    #[async_trait]
    impl Transaction for MemoryTransaction {
        async fn commit(mut self: Box<Self>) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                // dropped unfinished: state is restored
                return Err(AppError::Database("store unavailable".to_string()));
            }
            self.finished = true;
            let dirty = self.dirty;
            let changes = Arc::clone(&self.changes);
            drop(self);
            if dirty {
                changes.send_modify(|rev| *rev += 1);
            }
            Ok(())
        }

        async fn rollback(mut self: Box<Self>) -> Result<()> {
            *self.guard = self.backup.clone();
            self.finished = true;
            Ok(())
        }
    }

    #[async_trait]
    impl QueueStoreTransaction for MemoryTransaction {
        async fn find_entry(&mut self, id: &str) -> Result<Option<QueueEntry>> {
            Ok(self.guard.find(id))
        }

        async fn delete_entry(&mut self, id: &str, requester: &OperatorId) -> Result<u64> {
            let before = self.guard.entries.len();
            self.guard
                .entries
                .retain(|e| !(e.id == id && e.can_be_removed_by(requester)));
            let deleted = (before - self.guard.entries.len()) as u64;
            self.dirty |= deleted > 0;
            Ok(deleted)
        }

        async fn append_history(&mut self, record: &HistoryRecord) -> Result<()> {
            self.guard.history.push(record.clone());
            self.dirty = true;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::InMemoryQueueStore;
    use super::*;
    use crate::error::AppError;
    use crate::port::{QueueStoreTransaction, Transaction, TransactionalQueueStore};
    use std::time::Duration;

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = InMemoryQueueStore::new();
        let entry = QueueEntry::new("dup0001", "Alice", "Billing", 1, "");

        store.insert(&entry).await.unwrap();
        let err = store.insert(&entry).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_is_arrival_ordered_and_filtered() {
        let store = InMemoryQueueStore::new();
        store
            .insert(&QueueEntry::new("late", "B", "Billing", 20, ""))
            .await
            .unwrap();
        store
            .insert(&QueueEntry::new("early", "A", "Billing", 10, ""))
            .await
            .unwrap();
        store
            .mark_served("late", &OperatorId::new("op"))
            .await
            .unwrap();

        let all: Vec<String> = store
            .list(EntryFilter::All)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(all, vec!["early", "late"]);

        let waiting = store.list(EntryFilter::Waiting).await.unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].id, "early");
    }

    #[tokio::test]
    async fn test_mark_served_rules() {
        let store = InMemoryQueueStore::new();
        let op1 = OperatorId::new("op-1");
        let op2 = OperatorId::new("op-2");
        store
            .insert(&QueueEntry::new("e1", "A", "Billing", 1, ""))
            .await
            .unwrap();

        assert_eq!(
            store.mark_served("e1", &op1).await.unwrap(),
            ServeOutcome::Accepted
        );
        assert_eq!(
            store.mark_served("e1", &op1).await.unwrap(),
            ServeOutcome::AlreadyServed
        );
        assert!(matches!(
            store.mark_served("e1", &op2).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            store.mark_served("nope", &op1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_subscription_sees_writes() {
        let store = InMemoryQueueStore::new();
        let mut sub = store.subscribe(EntryFilter::Waiting).await.unwrap();
        assert!(sub.next().await.unwrap().data.is_empty());

        store
            .insert(&QueueEntry::new("e1", "A", "Billing", 1, ""))
            .await
            .unwrap();
        let snapshot = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.data.len(), 1);
        assert_eq!(snapshot.revision, store.revision());
    }

    #[tokio::test]
    async fn test_rolled_back_delete_is_restored() {
        let store = InMemoryQueueStore::new();
        let op = OperatorId::new("op");
        store
            .insert(&QueueEntry::new("e1", "A", "Billing", 1, ""))
            .await
            .unwrap();

        let mut tx = store.begin_transaction().await.unwrap();
        assert_eq!(tx.delete_entry("e1", &op).await.unwrap(), 1);
        tx.rollback().await.unwrap();

        assert!(store.find_by_id("e1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_store_side_removal_rule() {
        let store = InMemoryQueueStore::new();
        let owner = OperatorId::new("owner");
        let other = OperatorId::new("other");
        store
            .insert(&QueueEntry::new("e1", "A", "Billing", 1, ""))
            .await
            .unwrap();
        store.mark_served("e1", &owner).await.unwrap();

        let mut tx = store.begin_transaction().await.unwrap();
        assert_eq!(tx.delete_entry("e1", &other).await.unwrap(), 0);
        assert_eq!(tx.delete_entry("e1", &owner).await.unwrap(), 1);
        tx.commit().await.unwrap();

        assert!(store.find_by_id("e1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let store = InMemoryQueueStore::new();
        store.set_fail_writes(true);
        let result = store
            .insert(&QueueEntry::new("e1", "A", "Billing", 1, ""))
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert!(store.list(EntryFilter::All).await.unwrap().is_empty());
        assert_eq!(store.revision(), 0);
    }
}
