// Queue Board Monitor - logs live per-category counts

use crate::application::shutdown::ShutdownToken;
use crate::domain::CategoryBoard;
use crate::port::{EntryFilter, QueueStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Waiting/served counts for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub waiting: usize,
    pub served: usize,
}

/// Summarize a board in display order
pub fn summarize(board: &CategoryBoard) -> Vec<CategorySummary> {
    board
        .groups()
        .iter()
        .map(|group| CategorySummary {
            category: group.category.clone(),
            waiting: group.waiting(),
            served: group.served(),
        })
        .collect()
}

/// Background loop that follows the full board and logs every change
pub struct BoardMonitor {
    store: Arc<dyn QueueStore>,
}

impl BoardMonitor {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }

    /// Run until `shutdown` fires or the subscription closes.
    ///
    /// Should be spawned in tokio::spawn
    pub async fn run(self, mut shutdown: ShutdownToken) {
        let mut subscription = match self.store.subscribe(EntryFilter::All).await {
            Ok(sub) => sub,
            Err(e) => {
                warn!(error = %e, "Board monitor could not subscribe");
                return;
            }
        };
        info!(label = subscription.label(), "Board monitor started");

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            tokio::select! {
                snapshot = subscription.next() => match snapshot {
                    Ok(snapshot) => {
                        let board = CategoryBoard::from_snapshot(&snapshot.data);
                        log_board(snapshot.revision, &board);
                    }
                    Err(e) => {
                        warn!(error = %e, "Board subscription closed");
                        break;
                    }
                },
                _ = shutdown.wait() => break,
            }
        }

        info!("Board monitor stopped");
    }
}

fn log_board(revision: u64, board: &CategoryBoard) {
    if board.is_empty() {
        info!(revision, "There is no one in the queue");
        return;
    }
    for summary in summarize(board) {
        info!(
            revision,
            category = %summary.category,
            waiting = summary.waiting,
            served = summary.served,
            "Queue board"
        );
    }
}
