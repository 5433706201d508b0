// Operator Session - wraps the identity gate for triage actions

use crate::domain::OperatorId;
use crate::error::{AppError, Result};
use crate::port::IdentityGate;
use std::sync::Arc;
use tracing::{info, warn};

pub struct OperatorSession {
    gate: Arc<dyn IdentityGate>,
}

impl OperatorSession {
    pub fn new(gate: Arc<dyn IdentityGate>) -> Self {
        Self { gate }
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> Result<OperatorId> {
        match self.gate.sign_in(username, password).await {
            Ok(operator) => {
                info!(operator = %operator, "Operator signed in");
                Ok(operator)
            }
            Err(e) => {
                warn!(username = %username, error = %e, "Operator sign-in rejected");
                Err(e)
            }
        }
    }

    pub async fn sign_out(&self) -> Result<()> {
        let operator = self.gate.current_identity();
        self.gate.sign_out().await?;
        if let Some(operator) = operator {
            info!(operator = %operator, "Operator signed out");
        }
        Ok(())
    }

    pub fn current(&self) -> Option<OperatorId> {
        self.gate.current_identity()
    }

    /// Identity for a mutating action
    ///
    /// # Errors
    /// - AppError::Unauthorized when nobody is signed in
    pub fn require_operator(&self) -> Result<OperatorId> {
        self.current()
            .ok_or_else(|| AppError::Unauthorized("operator not signed in".to_string()))
    }
}
