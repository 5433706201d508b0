// Port Layer - Interfaces for external dependencies

pub mod category_source;
pub mod id_provider; // For deterministic testing
pub mod identity;
pub mod queue_store;
pub mod subscription;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use category_source::CategorySource;
pub use id_provider::IdProvider;
pub use identity::IdentityGate;
pub use queue_store::{EntryFilter, QueueStore};
pub use subscription::{spawn_snapshot_feed, Snapshot, Subscription};
pub use time_provider::TimeProvider;
pub use transaction::{QueueStoreTransaction, Transaction, TransactionalQueueStore};
