// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures the visitor or operator caused and can correct
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::Unauthorized(_)
                | AppError::Auth(_)
                | AppError::Conflict(_)
                | AppError::NotFound(_)
        )
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// sqlx::Error conversion lives in the infra-sqlite crate (map_sqlx_error)

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn test_domain_error_converts() {
        let err: AppError = DomainError::AlreadyServed {
            id: "abc1234".to_string(),
            served_by: "desk1".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::Domain(_)));
        assert!(err.to_string().contains("abc1234"));
    }

    #[test]
    fn test_user_facing_classification() {
        assert!(AppError::Validation("name".into()).is_user_facing());
        assert!(AppError::Auth("wrong".into()).is_user_facing());
        assert!(!AppError::Database("io".into()).is_user_facing());
        assert!(!AppError::Subscription("closed".into()).is_user_facing());
    }
}
