//! Single-slot store for the latest snapshot.
//!
//! The fetcher publishes, the renderer reads. A snapshot is never mutated
//! after publishing: `publish` swaps in a new `Arc`, readers clone the `Arc`
//! they see, so a read always observes exactly one published value.
//! Intermediate values may be skipped; only the latest matters.

use std::sync::Arc;
use tokio::sync::watch;

use crate::models::Snapshot;

#[derive(Clone)]
pub struct SnapshotStore {
    tx: Arc<watch::Sender<Arc<Snapshot>>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// A store that reports `Pending` until the first publish.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Snapshot::Pending));
        SnapshotStore { tx: Arc::new(tx) }
    }

    /// Replace the current snapshot.
    pub fn publish(&self, snapshot: Snapshot) {
        self.tx.send_replace(Arc::new(snapshot));
    }

    pub fn read_current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.tx.borrow())
    }

    /// Receiver that is notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }
}
