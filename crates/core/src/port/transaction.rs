// Transaction port for atomic operations

use crate::domain::{HistoryRecord, OperatorId, QueueEntry};
use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction and notify subscribers
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Transactional QueueStore operations
#[async_trait]
pub trait TransactionalQueueStore: Send + Sync {
    /// Begin a new transaction
    async fn begin_transaction(&self) -> Result<Box<dyn QueueStoreTransaction>>;
}

/// QueueStore operations within a transaction
#[async_trait]
pub trait QueueStoreTransaction: Transaction {
    /// Find entry (within transaction)
    async fn find_entry(&mut self, id: &str) -> Result<Option<QueueEntry>>;

    /// Delete entry if `requester` is allowed to remove it (within transaction).
    ///
    /// The store evaluates the removal rule itself: the row is deleted only
    /// when it is not served or was served by `requester`.
    ///
    /// # Returns
    /// Number of entries deleted (0 or 1)
    async fn delete_entry(&mut self, id: &str, requester: &OperatorId) -> Result<u64>;

    /// Append a history record (within transaction)
    async fn append_history(&mut self, record: &HistoryRecord) -> Result<()>;
}
