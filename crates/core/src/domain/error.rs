// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Entry {id} already served by {served_by}")]
    AlreadyServed { id: String, served_by: String },

    #[error("Operator {operator} may not remove entry {id} served by {served_by}")]
    RemovalForbidden {
        id: String,
        operator: String,
        served_by: String,
    },
}

pub type Result<T> = std::result::Result<T, DomainError>;
