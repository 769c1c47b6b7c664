// ── Reactive snapshot stream ──
//
// Subscription type for consuming published snapshots from the store.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Snapshot;

/// A subscription to published snapshots.
///
/// Provides both point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`. A slow
/// subscriber skips intermediate versions and always lands on the newest.
pub struct SnapshotStream {
    current: Arc<Snapshot>,
    receiver: watch::Receiver<Arc<Snapshot>>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Snapshot>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot seen at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<Snapshot> {
        &self.current
    }

    /// The latest published snapshot (may be newer than `current`).
    pub fn latest(&self) -> Arc<Snapshot> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next publish.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Snapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` that yields the current snapshot first,
    /// then one item per publish.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SnapshotWatchStream {
    inner: WatchStream<Arc<Snapshot>>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<Snapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
