// ── Poll scheduler ──
//
// Full lifecycle for one gateway: first acquisition, inventory seeding,
// the background poll loop with backoff, and clean shutdown. Consumers
// read snapshots from the store; they never wait on the network.

mod backoff;
mod driver;
mod state;

use std::sync::Arc;

use tigomon_api::PayloadGrammar;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub use backoff::Backoff;
pub use driver::{CycleOutcome, PollDriver};
pub use state::{Availability, PollState};

use crate::config::GatewayConfig;
use crate::error::CoreError;
use crate::gateway::GatewaySource;
use crate::model::Snapshot;
use crate::store::SnapshotStore;
use crate::stream::SnapshotStream;

/// Handle to a running poll loop.
///
/// Cheaply cloneable via `Arc<PollerInner>`. Dropping every handle does
/// not stop the loop; call [`shutdown()`](Self::shutdown).
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    store: Arc<SnapshotStore>,
    state: watch::Receiver<PollState>,
    availability: watch::Receiver<Availability>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    /// Validate `config`, acquire the first session, seed the inventory,
    /// and spawn the poll loop. The first cycle runs immediately.
    ///
    /// Fails fast with a [`CoreError`] if the configuration is invalid,
    /// the gateway is unreachable, or the credentials are rejected.
    pub async fn start<S: GatewaySource>(
        config: &GatewayConfig,
        source: S,
        grammar: Arc<dyn PayloadGrammar>,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        let store = Arc::new(SnapshotStore::new());
        let mut driver = PollDriver::new(config, source, grammar, Arc::clone(&store));
        driver.connect().await?;
        driver.seed_inventory().await;

        let cancel = CancellationToken::new();
        let state = driver.subscribe_state();
        let availability = driver.subscribe_availability();
        let handle = tokio::spawn(poll_task(driver, cancel.clone()));

        info!(host = %config.endpoint.host, interval = ?config.poll_interval, "poller started");

        Ok(Self {
            inner: Arc::new(PollerInner {
                store,
                state,
                availability,
                cancel,
                task: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Run exactly one cycle without spawning a loop.
    ///
    /// Used for one-shot reads: returns the published snapshot, or the
    /// cycle's error if nothing could be published.
    pub async fn poll_once<S: GatewaySource>(
        config: &GatewayConfig,
        source: S,
        grammar: Arc<dyn PayloadGrammar>,
    ) -> Result<Arc<Snapshot>, CoreError> {
        config.validate()?;

        let store = Arc::new(SnapshotStore::new());
        let mut driver = PollDriver::new(config, source, grammar, store);
        driver.connect().await?;
        driver.seed_inventory().await;

        let outcome = driver.run_cycle().await;
        driver.release();

        match outcome {
            CycleOutcome::Published(snapshot) => Ok(snapshot),
            CycleOutcome::Failed { error, .. } => Err(error),
        }
    }

    // ── Consumer accessors ───────────────────────────────────────────

    /// The latest published snapshot. Always readable, even while the
    /// gateway is failing; check `captured_at` for freshness.
    pub fn latest(&self) -> Arc<Snapshot> {
        self.inner.store.latest()
    }

    /// Notification hook: one wake-up per published snapshot.
    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.inner.store
    }

    pub fn state(&self) -> PollState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PollState> {
        self.inner.state.clone()
    }

    pub fn availability(&self) -> Availability {
        self.inner.availability.borrow().clone()
    }

    pub fn subscribe_availability(&self) -> watch::Receiver<Availability> {
        self.inner.availability.clone()
    }

    /// False after [`shutdown()`](Self::shutdown) or once the loop has died.
    pub fn is_running(&self) -> bool {
        !self.inner.cancel.is_cancelled()
    }

    // ── Shutdown ─────────────────────────────────────────────────────

    /// Stop the loop and wait for it to exit.
    ///
    /// Any in-flight wait or request is abandoned at its next suspension
    /// point and the session is released. Idempotent.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let handle = self.inner.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "poll loop terminated abnormally");
            }
        }
        debug!("poller stopped");
    }
}

// ── Background task ──────────────────────────────────────────────────

async fn poll_task<S: GatewaySource>(mut driver: PollDriver<S>, cancel: CancellationToken) {
    // Marks the poller stopped however the loop exits, unwinding included.
    let _stopped = cancel.clone().drop_guard();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = driver.run_cycle() => {}
        }

        let delay = driver.next_delay();
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
        driver.set_state(PollState::Idle);
    }

    driver.release();
    driver.set_state(PollState::Stopped);
}
