// Submit Use Case

use crate::domain::{CategorySet, EntryId, QueueEntry};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, QueueStore, TimeProvider};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Attempts to find an unused entry id before giving up
pub const MAX_ID_ATTEMPTS: usize = 3;

/// Visitor registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub name: String,
    pub category: String,
}

impl SubmitRequest {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }
}

/// Validate a request against the loaded category set
pub fn validate_request(req: &SubmitRequest, categories: &CategorySet) -> Result<()> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Please enter your name.".to_string()));
    }
    if req.category.trim().is_empty() {
        return Err(AppError::Validation("Please select a category.".to_string()));
    }
    if !categories.contains(&req.category) {
        return Err(AppError::Validation(format!(
            "Unknown category: {}",
            req.category
        )));
    }
    Ok(())
}

/// Execute submit use case
///
/// # Arguments
///
/// * `store` - Queue store
/// * `id_provider` - Entry token generator (injected for determinism)
/// * `time_provider` - Time provider (injected for determinism)
/// * `categories` - Category set loaded at registration time
/// * `req` - Submit request
pub async fn execute(
    store: &dyn QueueStore,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    categories: &CategorySet,
    req: SubmitRequest,
) -> Result<EntryId> {
    validate_request(&req, categories)?;

    let arrived_at = time_provider.now_millis();
    let arrival_display = time_provider.format_arrival(arrived_at);
    let name = req.name.trim().to_string();

    for attempt in 1..=MAX_ID_ATTEMPTS {
        let entry = QueueEntry::new(
            id_provider.generate_id(),
            name.clone(),
            req.category.clone(),
            arrived_at,
            arrival_display.clone(),
        );

        match store.insert(&entry).await {
            Ok(()) => {
                info!(
                    entry_id = %entry.id,
                    category = %entry.category,
                    arrival = %entry.arrival_display,
                    "Entry submitted"
                );
                return Ok(entry.id);
            }
            Err(AppError::Conflict(_)) => {
                // id collision, not a write failure
                warn!(entry_id = %entry.id, attempt, "Entry id already taken, regenerating");
            }
            Err(e) => {
                error!(error = %e, category = %entry.category, "Failed to submit entry");
                return Err(e);
            }
        }
    }

    Err(AppError::Conflict(format!(
        "No free entry id after {} attempts",
        MAX_ID_ATTEMPTS
    )))
}
