// SQLite QueueStore Implementation

use crate::{map_sqlx_error, SqliteQueueTransaction};
use async_trait::async_trait;
use qless_core::domain::{HistoryRecord, OperatorId, QueueEntry, ServeOutcome};
use qless_core::error::{AppError, Result};
use qless_core::port::{
    spawn_snapshot_feed, EntryFilter, QueueStore, QueueStoreTransaction, Subscription,
    TransactionalQueueStore,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

const SELECT_ALL: &str = r#"
    SELECT id, name, category, arrived_at, arrival_display, served, served_by
    FROM entries
    ORDER BY arrived_at ASC, id ASC
"#;

const SELECT_WAITING: &str = r#"
    SELECT id, name, category, arrived_at, arrival_display, served, served_by
    FROM entries
    WHERE served = 0
    ORDER BY arrived_at ASC, id ASC
"#;

const SELECT_ONE: &str = r#"
    SELECT id, name, category, arrived_at, arrival_display, served, served_by
    FROM entries
    WHERE id = ?
"#;

/// Queue store over SQLite.
///
/// Change fan-out is in-process: every committed write through this store
/// (or a transaction it began) bumps the revision counter and each
/// subscription re-queries. Writes from other processes are not observed.
#[derive(Clone)]
pub struct SqliteQueueStore {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
}

impl SqliteQueueStore {
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            pool,
            changes: Arc::new(changes),
        }
    }

    /// Current store revision
    pub fn revision(&self) -> u64 {
        *self.changes.borrow()
    }

    /// Number of live subscription feeds
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Removal audit, oldest first
    pub async fn history(&self) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, name, category, arrived_at, arrival_display, removed_at, removed_by
            FROM history
            ORDER BY removed_at ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(HistoryRow::into_record).collect())
    }

    fn notify(&self) {
        notify_changed(&self.changes);
    }
}

pub(crate) fn notify_changed(changes: &watch::Sender<u64>) {
    changes.send_modify(|rev| *rev += 1);
    debug!(revision = *changes.borrow(), "Queue store changed");
}

async fn select_entries(pool: &SqlitePool, filter: EntryFilter) -> Result<Vec<QueueEntry>> {
    let sql = match filter {
        EntryFilter::All => SELECT_ALL,
        EntryFilter::Waiting => SELECT_WAITING,
    };
    let rows = sqlx::query_as::<_, EntryRow>(sql)
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_error)?;
    Ok(rows.into_iter().map(EntryRow::into_entry).collect())
}

async fn select_entry(pool: &SqlitePool, id: &str) -> Result<Option<QueueEntry>> {
    let row = sqlx::query_as::<_, EntryRow>(SELECT_ONE)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(map_sqlx_error)?;
    Ok(row.map(EntryRow::into_entry))
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn insert(&self, entry: &QueueEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO entries (
                id, name, category, arrived_at, arrival_display, served, served_by
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.name)
        .bind(&entry.category)
        .bind(entry.arrived_at)
        .bind(&entry.arrival_display)
        .bind(entry.served)
        .bind(entry.served_by.as_ref().map(|op| op.as_str()))
        .execute(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("Entry {} already exists", entry.id))
            }
            other => other,
        })?;

        self.notify();
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<QueueEntry>> {
        select_entry(&self.pool, id).await
    }

    async fn list(&self, filter: EntryFilter) -> Result<Vec<QueueEntry>> {
        select_entries(&self.pool, filter).await
    }

    async fn mark_served(&self, id: &str, operator: &OperatorId) -> Result<ServeOutcome> {
        // Conditional update: concurrent accepts race on `served = 0`
        let result = sqlx::query(
            r#"
            UPDATE entries
            SET served = 1, served_by = ?
            WHERE id = ? AND served = 0
            "#,
        )
        .bind(operator.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 1 {
            self.notify();
            return Ok(ServeOutcome::Accepted);
        }

        let served_by: Option<Option<String>> =
            sqlx::query_scalar("SELECT served_by FROM entries WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        match served_by {
            None => Err(AppError::NotFound(format!("Entry {} not found", id))),
            Some(Some(by)) if by == operator.as_str() => Ok(ServeOutcome::AlreadyServed),
            Some(by) => Err(AppError::Conflict(format!(
                "Entry {} already served by {}",
                id,
                by.as_deref().unwrap_or("unknown operator")
            ))),
        }
    }

    async fn subscribe(&self, filter: EntryFilter) -> Result<Subscription<Vec<QueueEntry>>> {
        let pool = self.pool.clone();
        spawn_snapshot_feed(
            format!("sqlite:{}", filter.as_str()),
            self.changes.subscribe(),
            move || {
                let pool = pool.clone();
                async move { select_entries(&pool, filter).await }
            },
        )
        .await
    }

    async fn watch_entry(&self, id: &str) -> Result<Subscription<Option<QueueEntry>>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        spawn_snapshot_feed(
            format!("sqlite:entry:{}", id),
            self.changes.subscribe(),
            move || {
                let pool = pool.clone();
                let id = id.clone();
                async move { select_entry(&pool, &id).await }
            },
        )
        .await
    }
}

#[async_trait]
impl TransactionalQueueStore for SqliteQueueStore {
    async fn begin_transaction(&self) -> Result<Box<dyn QueueStoreTransaction>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteQueueTransaction::new(
            tx,
            Arc::clone(&self.changes),
        )))
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EntryRow {
    id: String,
    name: String,
    category: String,
    arrived_at: i64,
    arrival_display: String,
    served: bool,
    served_by: Option<String>,
}

impl EntryRow {
    pub(crate) fn into_entry(self) -> QueueEntry {
        QueueEntry {
            id: self.id,
            name: self.name,
            category: self.category,
            arrived_at: self.arrived_at,
            arrival_display: self.arrival_display,
            served: self.served,
            served_by: self.served_by.map(OperatorId::new),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: String,
    name: String,
    category: String,
    arrived_at: i64,
    arrival_display: String,
    removed_at: i64,
    removed_by: String,
}

impl HistoryRow {
    fn into_record(self) -> HistoryRecord {
        HistoryRecord {
            id: self.id,
            name: self.name,
            category: self.category,
            arrived_at: self.arrived_at,
            arrival_display: self.arrival_display,
            removed_at: self.removed_at,
            removed_by: OperatorId::new(self.removed_by),
        }
    }
}
