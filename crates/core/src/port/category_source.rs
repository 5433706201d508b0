// Category Source Port

use crate::error::Result;
use async_trait::async_trait;

/// Read-once source of category documents.
///
/// Each document carries an array of category labels; the active set is the
/// union of all of them.
#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn load_category_documents(&self) -> Result<Vec<Vec<String>>>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::{Mutex, PoisonError};

    /// Category documents held in memory
    pub struct StaticCategorySource {
        documents: Mutex<Vec<Vec<String>>>,
        fail: Mutex<bool>,
    }

    impl StaticCategorySource {
        pub fn new(documents: Vec<Vec<&str>>) -> Self {
            Self {
                documents: Mutex::new(
                    documents
                        .into_iter()
                        .map(|d| d.into_iter().map(str::to_string).collect())
                        .collect(),
                ),
                fail: Mutex::new(false),
            }
        }

        pub fn set_documents(&self, documents: Vec<Vec<&str>>) {
            *self.documents.lock().unwrap_or_else(PoisonError::into_inner) = documents
                .into_iter()
                .map(|d| d.into_iter().map(str::to_string).collect())
                .collect();
        }

        pub fn set_fail(&self, fail: bool) {
            *self.fail.lock().unwrap_or_else(PoisonError::into_inner) = fail;
        }
    }

    #[async_trait]
    impl CategorySource for StaticCategorySource {
        async fn load_category_documents(&self) -> Result<Vec<Vec<String>>> {
            if *self.fail.lock().unwrap_or_else(PoisonError::into_inner) {
                return Err(AppError::Database("category source unavailable".to_string()));
            }
            Ok(self.documents.lock().unwrap_or_else(PoisonError::into_inner).clone())
        }
    }
}
