// SQLite Transaction Implementation

use crate::map_sqlx_error;
use crate::queue_store::{notify_changed, EntryRow};
use async_trait::async_trait;
use qless_core::domain::{HistoryRecord, OperatorId, QueueEntry};
use qless_core::error::Result;
use qless_core::port::{QueueStoreTransaction, Transaction};
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use std::sync::Arc;
use tokio::sync::watch;

pub struct SqliteQueueTransaction<'a> {
    tx: SqlxTransaction<'a, Sqlite>,
    changes: Arc<watch::Sender<u64>>,
    dirty: bool,
}

impl<'a> SqliteQueueTransaction<'a> {
    pub fn new(tx: SqlxTransaction<'a, Sqlite>, changes: Arc<watch::Sender<u64>>) -> Self {
        Self {
            tx,
            changes,
            dirty: false,
        }
    }
}

#[async_trait]
impl Transaction for SqliteQueueTransaction<'_> {
    async fn commit(self: Box<Self>) -> Result<()> {
        let Self { tx, changes, dirty } = *self;
        tx.commit().await.map_err(map_sqlx_error)?;
        if dirty {
            notify_changed(&changes);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl QueueStoreTransaction for SqliteQueueTransaction<'_> {
    async fn find_entry(&mut self, id: &str) -> Result<Option<QueueEntry>> {
        let row = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, name, category, arrived_at, arrival_display, served, served_by
            FROM entries
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(EntryRow::into_entry))
    }

    async fn delete_entry(&mut self, id: &str, requester: &OperatorId) -> Result<u64> {
        // Removal rule enforced in SQL as well as in the domain
        let result = sqlx::query(
            r#"
            DELETE FROM entries
            WHERE id = ? AND (served = 0 OR served_by = ?)
            "#,
        )
        .bind(id)
        .bind(requester.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() > 0 {
            self.dirty = true;
        }
        Ok(result.rows_affected())
    }

    async fn append_history(&mut self, record: &HistoryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO history (
                id, name, category, arrived_at, arrival_display, removed_at, removed_by
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.category)
        .bind(record.arrived_at)
        .bind(&record.arrival_display)
        .bind(record.removed_at)
        .bind(record.removed_by.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        self.dirty = true;
        Ok(())
    }
}
