// ── Snapshot store ──
//
// Holds the latest published snapshot. Reads are wait-free via `ArcSwap`;
// subscribers are woken through a `watch` channel on every publish.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::debug;

use crate::model::Snapshot;
use crate::stream::SnapshotStream;

/// Atomic publish point for topology snapshots.
///
/// Readers never observe a partially built snapshot: publishing is a
/// single pointer swap of a fully constructed value.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    notify: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::with_initial(Snapshot::default())
    }

    pub fn with_initial(initial: Snapshot) -> Self {
        let initial = Arc::new(initial);
        let (notify, _) = watch::channel(Arc::clone(&initial));
        Self {
            current: ArcSwap::new(initial),
            notify,
        }
    }

    /// The latest published snapshot (cheap `Arc` clone).
    pub fn latest(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Replace the published snapshot and notify subscribers.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::clone(&snapshot));
        // `send_replace` updates unconditionally, even with zero receivers.
        self.notify.send_replace(Arc::clone(&snapshot));
        debug!(
            version = snapshot.version,
            devices = snapshot.devices.len(),
            "published snapshot"
        );
        snapshot
    }

    /// Replace the stored snapshot without waking subscribers.
    ///
    /// For state that is not a poll result, such as the node inventory
    /// registered before the first cycle.
    pub fn seed(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::clone(&snapshot));
        self.notify.send_if_modified(|value| {
            *value = Arc::clone(&snapshot);
            false
        });
        debug!(
            version = snapshot.version,
            devices = snapshot.devices.len(),
            "seeded snapshot"
        );
        snapshot
    }

    /// Subscribe to future publishes.
    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.notify.subscribe())
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
