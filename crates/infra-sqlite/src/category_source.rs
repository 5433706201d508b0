// SQLite CategorySource Implementation

use crate::map_sqlx_error;
use async_trait::async_trait;
use qless_core::error::Result;
use qless_core::port::CategorySource;
use sqlx::SqlitePool;
use tracing::info;

/// Category documents stored as JSON arrays, one row per document
pub struct SqliteCategorySource {
    pool: SqlitePool,
}

impl SqliteCategorySource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create or replace the document called `name`
    pub async fn put_category_document(&self, name: &str, categories: &[String]) -> Result<()> {
        let encoded = serde_json::to_string(categories)?;

        sqlx::query(
            r#"
            INSERT INTO category_documents (name, categories) VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET categories = excluded.categories
            "#,
        )
        .bind(name)
        .bind(&encoded)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        info!(document = %name, count = categories.len(), "Category document stored");
        Ok(())
    }
}

#[async_trait]
impl CategorySource for SqliteCategorySource {
    async fn load_category_documents(&self) -> Result<Vec<Vec<String>>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT categories FROM category_documents ORDER BY seq ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|raw| serde_json::from_str::<Vec<String>>(raw).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use qless_core::domain::CategorySet;
    use qless_core::error::AppError;

    async fn setup() -> (SqlitePool, SqliteCategorySource) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        (pool.clone(), SqliteCategorySource::new(pool))
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_documents_in_insertion_order() {
        let (_, source) = setup().await;
        source
            .put_category_document("front-desk", &labels(&["Billing", "Support"]))
            .await
            .unwrap();
        source
            .put_category_document("counter", &labels(&["Support", "Returns"]))
            .await
            .unwrap();

        let documents = source.load_category_documents().await.unwrap();
        assert_eq!(documents.len(), 2);

        let set = CategorySet::from_documents(documents);
        assert_eq!(set.as_slice(), &labels(&["Billing", "Support", "Returns"])[..]);
    }

    #[tokio::test]
    async fn test_put_replaces_document() {
        let (_, source) = setup().await;
        source
            .put_category_document("front-desk", &labels(&["Billing"]))
            .await
            .unwrap();
        source
            .put_category_document("front-desk", &labels(&["Support"]))
            .await
            .unwrap();

        let documents = source.load_category_documents().await.unwrap();
        assert_eq!(documents, vec![labels(&["Support"])]);
    }

    #[tokio::test]
    async fn test_malformed_document_is_serialization_error() {
        let (pool, source) = setup().await;
        sqlx::query("INSERT INTO category_documents (name, categories) VALUES ('bad', 'not json')")
            .execute(&pool)
            .await
            .unwrap();

        let err = source.load_category_documents().await.unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
