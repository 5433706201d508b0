// Domain Layer - Pure business logic and entities

pub mod board;
pub mod category;
pub mod entry;
pub mod error;
pub mod position;

// Re-exports
pub use board::{CategoryBoard, CategoryGroup};
pub use category::{Category, CategorySet};
pub use entry::{EntryId, HistoryRecord, OperatorId, QueueEntry, ServeOutcome};
pub use error::DomainError;
pub use position::{PositionStatus, QueueCounts};
