// Category Domain Model

use serde::{Deserialize, Serialize};

/// Service category label
pub type Category = String;

/// Active category set, fixed at the time it was loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySet {
    categories: Vec<Category>,
}

impl CategorySet {
    /// Union of every document's category array, in first-seen order.
    /// Blank labels and duplicates are dropped.
    pub fn from_documents<I, D>(documents: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: IntoIterator<Item = String>,
    {
        let mut categories: Vec<Category> = Vec::new();
        for doc in documents {
            for label in doc {
                let label = label.trim();
                if label.is_empty() || categories.iter().any(|c| c == label) {
                    continue;
                }
                categories.push(label.to_string());
            }
        }
        Self { categories }
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn as_slice(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }
}
