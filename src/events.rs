//! # Sync Status Events
//!
//! A broadcast channel carrying [`SyncStatus`] snapshots. The orchestrator
//! emits one on every processed page, on pause, on completion and on error.
//! Consumers can either subscribe to the stream or read the latest snapshot.

use crate::types::SyncStatus;
use tokio::sync::{broadcast, watch};

/// A handle for receiving status updates from the orchestrator.
///
/// # Examples
///
/// ```rust,no_run
/// use scrobble_index::{StatusBroadcaster, SyncState};
/// use tokio::sync::broadcast::error::RecvError;
///
/// # async fn watch(broadcaster: StatusBroadcaster) {
/// let mut receiver = broadcaster.subscribe();
/// loop {
///     match receiver.recv().await {
///         Ok(status) if status.status == SyncState::Syncing => {
///             println!("page {}/{} ({}%)", status.current_page, status.total_pages, status.progress);
///         }
///         Ok(status) => println!("sync {}", status.status),
///         Err(RecvError::Lagged(skipped)) => println!("{skipped} updates skipped"),
///         Err(RecvError::Closed) => break,
///     }
/// }
/// # }
/// ```
pub type SyncStatusReceiver = broadcast::Receiver<SyncStatus>;

/// Fan-out of status snapshots that also remembers the latest one.
#[derive(Clone)]
pub struct StatusBroadcaster {
    event_tx: broadcast::Sender<SyncStatus>,
    last_status_tx: watch::Sender<SyncStatus>,
}

impl StatusBroadcaster {
    /// The channel keeps the last 100 snapshots for slow subscribers.
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let (last_status_tx, _) = watch::channel(SyncStatus::default());

        Self {
            event_tx,
            last_status_tx,
        }
    }

    pub fn broadcast(&self, status: SyncStatus) {
        let _ = self.event_tx.send(status.clone()); // no subscribers is fine
        self.last_status_tx.send_replace(status);
    }

    pub fn subscribe(&self) -> SyncStatusReceiver {
        self.event_tx.subscribe()
    }

    pub fn latest(&self) -> SyncStatus {
        self.last_status_tx.borrow().clone()
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBroadcaster")
            .field("subscribers", &self.event_tx.receiver_count())
            .finish()
    }
}
