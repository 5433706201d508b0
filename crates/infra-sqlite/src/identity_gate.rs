// SQLite IdentityGate Implementation

use crate::map_sqlx_error;
use async_trait::async_trait;
use qless_core::domain::OperatorId;
use qless_core::error::{AppError, Result};
use qless_core::port::IdentityGate;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::RwLock;
use tracing::{debug, info};

const SALT_LEN: usize = 16;
const SIGN_IN_FAILED: &str = "Wrong username or password";

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn new_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, sqlx::FromRow)]
struct OperatorRow {
    operator_id: String,
    salt: String,
    password_hash: String,
}

/// Operator sign-in backed by the `operators` table.
///
/// Each gate holds one operator session.
pub struct SqliteIdentityGate {
    pool: SqlitePool,
    current: RwLock<Option<OperatorId>>,
}

impl SqliteIdentityGate {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            current: RwLock::new(None),
        }
    }

    /// Provision an operator, or reset the password of an existing one.
    ///
    /// The operator id survives password resets.
    pub async fn register_operator(
        &self,
        username: &str,
        password: &str,
        created_at: i64,
    ) -> Result<OperatorId> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Operator username and password are required".to_string(),
            ));
        }

        let salt = new_salt();
        let operator_id: String = sqlx::query_scalar(
            r#"
            INSERT INTO operators (username, operator_id, salt, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(username) DO UPDATE
                SET salt = excluded.salt, password_hash = excluded.password_hash
            RETURNING operator_id
            "#,
        )
        .bind(username)
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&salt)
        .bind(hash_password(&salt, password))
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        info!(username = %username, operator_id = %operator_id, "Operator registered");
        Ok(OperatorId::new(operator_id))
    }

    fn set_current(&self, operator: Option<OperatorId>) -> Result<()> {
        let mut current = self
            .current
            .write()
            .map_err(|_| AppError::Internal("identity lock poisoned".to_string()))?;
        *current = operator;
        Ok(())
    }
}

#[async_trait]
impl IdentityGate for SqliteIdentityGate {
    async fn sign_in(&self, username: &str, password: &str) -> Result<OperatorId> {
        let row = sqlx::query_as::<_, OperatorRow>(
            "SELECT operator_id, salt, password_hash FROM operators WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        // Unknown user and wrong password are indistinguishable to the caller
        let Some(row) = row else {
            debug!(username = %username, "Unknown operator");
            return Err(AppError::Auth(SIGN_IN_FAILED.to_string()));
        };
        if hash_password(&row.salt, password) != row.password_hash {
            return Err(AppError::Auth(SIGN_IN_FAILED.to_string()));
        }

        let operator = OperatorId::new(row.operator_id);
        self.set_current(Some(operator.clone()))?;
        Ok(operator)
    }

    fn current_identity(&self) -> Option<OperatorId> {
        self.current.read().ok().and_then(|c| c.clone())
    }

    async fn sign_out(&self) -> Result<()> {
        self.set_current(None)
    }
}
