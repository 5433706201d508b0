// Subscription handles for live store queries
//
// A subscription is a disposable handle: dropping it aborts the task that
// feeds it, so no server-push channel outlives its owning scope.

use crate::error::{AppError, Result};
use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A complete result set as of one store revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    pub revision: u64,
    pub data: T,
}

/// Live query result stream
pub struct Subscription<T> {
    label: String,
    rx: watch::Receiver<Snapshot<T>>,
    feeder: Option<JoinHandle<()>>,
    initial_delivered: bool,
}

impl<T: Clone> Subscription<T> {
    pub fn new(
        label: impl Into<String>,
        rx: watch::Receiver<Snapshot<T>>,
        feeder: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            label: label.into(),
            rx,
            feeder,
            initial_delivered: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Most recent snapshot, without waiting
    pub fn latest(&self) -> Snapshot<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot.
    ///
    /// The first call returns the snapshot taken when the subscription was
    /// opened. Intermediate snapshots may be skipped; the one returned is
    /// always the newest.
    pub async fn next(&mut self) -> Result<Snapshot<T>> {
        if !self.initial_delivered {
            self.initial_delivered = true;
            return Ok(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.map_err(|_| {
            AppError::Subscription(format!("{} subscription closed", self.label))
        })?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// False once the feeder task has stopped
    pub fn is_active(&self) -> bool {
        self.feeder.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
            debug!(subscription = %self.label, "Subscription released");
        }
    }
}

/// Open a subscription that re-runs `query` on every store revision.
///
/// `changes` is the store's revision counter. The initial query runs before
/// this returns, so setup failures surface to the caller; later query
/// failures are logged and the subscriber keeps its last snapshot.
pub async fn spawn_snapshot_feed<T, F, Fut>(
    label: impl Into<String>,
    mut changes: watch::Receiver<u64>,
    query: F,
) -> Result<Subscription<T>>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let label = label.into();
    let revision = *changes.borrow_and_update();
    let initial = query().await.map_err(|e| {
        AppError::Subscription(format!("{} subscription setup failed: {}", label, e))
    })?;

    let (tx, rx) = watch::channel(Snapshot {
        revision,
        data: initial,
    });

    let task_label = label.clone();
    let feeder = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        debug!(subscription = %task_label, "Store closed, ending feed");
                        break;
                    }
                }
                _ = tx.closed() => break,
            }

            let revision = *changes.borrow_and_update();
            match query().await {
                Ok(data) => {
                    if tx.send(Snapshot { revision, data }).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        subscription = %task_label,
                        revision,
                        error = %e,
                        "Snapshot query failed, subscriber keeps last snapshot"
                    );
                }
            }
        }
    });

    debug!(subscription = %label, revision, "Subscription opened");
    Ok(Subscription::new(label, rx, Some(feeder)))
}
