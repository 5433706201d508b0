// Registration Service - visitor-facing queue submissions

pub mod submit;

pub use submit::SubmitRequest;

use crate::domain::{CategorySet, EntryId};
use crate::error::{AppError, Result};
use crate::port::{CategorySource, IdProvider, QueueStore, TimeProvider};
use std::sync::{Arc, RwLock};
use tracing::{error, info};

/// Registration Service
///
/// Holds the category set loaded at startup. The set is not kept live:
/// call `refresh_categories` to pick up configuration changes.
pub struct RegistrationService {
    store: Arc<dyn QueueStore>,
    category_source: Arc<dyn CategorySource>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    categories: RwLock<Option<CategorySet>>,
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn QueueStore>,
        category_source: Arc<dyn CategorySource>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            category_source,
            id_provider,
            time_provider,
            categories: RwLock::new(None),
        }
    }

    /// Load categories once; later calls return the cached set
    pub async fn load_categories(&self) -> Result<CategorySet> {
        if let Some(set) = self.categories() {
            return Ok(set);
        }
        self.refresh_categories().await
    }

    /// Re-read the category source and replace the cached set
    pub async fn refresh_categories(&self) -> Result<CategorySet> {
        let documents = self
            .category_source
            .load_category_documents()
            .await
            .inspect_err(|e| error!(error = %e, "Failed to load categories"))?;

        let set = CategorySet::from_documents(documents);
        info!(count = set.len(), "Categories loaded");

        let mut cached = self
            .categories
            .write()
            .map_err(|_| AppError::Internal("category cache poisoned".to_string()))?;
        *cached = Some(set.clone());
        Ok(set)
    }

    /// Cached category set, if loaded
    pub fn categories(&self) -> Option<CategorySet> {
        self.categories.read().ok().and_then(|c| c.clone())
    }

    /// Register a visitor
    pub async fn submit(
        &self,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<EntryId> {
        let categories = self.categories().ok_or_else(|| {
            AppError::Validation("Categories are not loaded yet.".to_string())
        })?;

        submit::execute(
            self.store.as_ref(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            &categories,
            SubmitRequest::new(name, category),
        )
        .await
    }
}
