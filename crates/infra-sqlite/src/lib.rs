// QLess Infrastructure - SQLite Adapter
// Implements: QueueStore, TransactionalQueueStore, CategorySource, IdentityGate

mod category_source;
mod connection;
mod error;
mod identity_gate;
mod migration;
mod queue_store;
mod transaction;

pub use category_source::SqliteCategorySource;
pub use connection::create_pool;
pub use identity_gate::SqliteIdentityGate;
pub use migration::run_migrations;
pub use queue_store::SqliteQueueStore;
pub use transaction::SqliteQueueTransaction;

pub(crate) use error::map_sqlx_error;

// sqlx::Error cannot implement Into<AppError> here (orphan rule), so every
// query maps through map_sqlx_error.
