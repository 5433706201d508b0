// Identity Gate Port

use crate::domain::OperatorId;
use crate::error::Result;
use async_trait::async_trait;

/// Operator authentication.
///
/// One gate instance represents one operator session: `current_identity`
/// is whoever signed in last through it.
#[async_trait]
pub trait IdentityGate: Send + Sync {
    /// Verify credentials and make the operator current
    ///
    /// # Errors
    /// - AppError::Auth on unknown username or wrong password
    async fn sign_in(&self, username: &str, password: &str) -> Result<OperatorId>;

    /// Currently signed-in operator, if any
    fn current_identity(&self) -> Option<OperatorId>;

    /// Clear the current operator
    async fn sign_out(&self) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::{PoisonError, RwLock};

    /// Fixed credential table; the operator id is `uid-<username>`
    pub struct StaticIdentityGate {
        credentials: HashMap<String, String>,
        current: RwLock<Option<OperatorId>>,
    }

    impl StaticIdentityGate {
        pub fn new(credentials: &[(&str, &str)]) -> Self {
            Self {
                credentials: credentials
                    .iter()
                    .map(|(u, p)| (u.to_string(), p.to_string()))
                    .collect(),
                current: RwLock::new(None),
            }
        }

        /// Gate already signed in as `username`
        pub fn signed_in(username: &str) -> Self {
            let gate = Self::new(&[(username, "secret")]);
            gate.set_current(Some(Self::operator_id(username)));
            gate
        }

        fn set_current(&self, operator: Option<OperatorId>) {
            *self.current.write().unwrap_or_else(PoisonError::into_inner) = operator;
        }

        pub fn operator_id(username: &str) -> OperatorId {
            OperatorId::new(format!("uid-{}", username))
        }
    }

    #[async_trait]
    impl IdentityGate for StaticIdentityGate {
        async fn sign_in(&self, username: &str, password: &str) -> Result<OperatorId> {
            match self.credentials.get(username) {
                Some(expected) if expected == password => {
                    let id = Self::operator_id(username);
                    self.set_current(Some(id.clone()));
                    Ok(id)
                }
                _ => Err(AppError::Auth("Wrong username or password".to_string())),
            }
        }

        fn current_identity(&self) -> Option<OperatorId> {
            self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
        }

        async fn sign_out(&self) -> Result<()> {
            self.set_current(None);
            Ok(())
        }
    }
}
