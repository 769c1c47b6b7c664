// ── Poll cycle driver ──
//
// One fetch → parse → reconcile → publish cycle at a time. The driver owns
// the session and all failure bookkeeping; the loop around it only decides
// when to call `run_cycle` next.

use std::sync::Arc;
use std::time::Duration;

use tigomon_api::{
    GatewayInfo, PayloadGrammar, RawPayload, parse_gateway_summary, parse_node_inventory,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use super::state::{Availability, PollState};
use crate::config::GatewayConfig;
use crate::error::CoreError;
use crate::gateway::GatewaySource;
use crate::model::Snapshot;
use crate::reconcile::{self, ReconcileOptions};
use crate::store::SnapshotStore;

/// Result of one [`PollDriver::run_cycle`].
#[derive(Debug)]
pub enum CycleOutcome {
    /// A new snapshot was published.
    Published(Arc<Snapshot>),
    /// Nothing was published; the previous snapshot stays current.
    Failed {
        error: CoreError,
        failures: u32,
        delay: Duration,
    },
}

impl CycleOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

/// Drives poll cycles against one gateway.
pub struct PollDriver<S: GatewaySource> {
    source: S,
    grammar: Arc<dyn PayloadGrammar>,
    store: Arc<SnapshotStore>,
    options: ReconcileOptions,
    backoff: Backoff,
    max_consecutive_failures: u32,
    summary_every_cycles: u32,
    session: Option<S::Session>,
    failures: u32,
    next_delay: Duration,
    cycles_until_summary: u32,
    state: watch::Sender<PollState>,
    availability: watch::Sender<Availability>,
}

impl<S: GatewaySource> PollDriver<S> {
    pub fn new(
        config: &GatewayConfig,
        source: S,
        grammar: Arc<dyn PayloadGrammar>,
        store: Arc<SnapshotStore>,
    ) -> Self {
        let backoff = config.backoff();
        let (state, _) = watch::channel(PollState::Idle);
        let (availability, _) = watch::channel(Availability::Available);
        Self {
            source,
            grammar,
            store,
            options: config.reconcile_options(),
            backoff,
            max_consecutive_failures: config.max_consecutive_failures,
            summary_every_cycles: config.summary_every_cycles,
            session: None,
            failures: 0,
            next_delay: backoff.delay(0),
            cycles_until_summary: 0,
            state,
            availability,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    pub fn availability(&self) -> Availability {
        self.availability.borrow().clone()
    }

    pub fn subscribe_availability(&self) -> watch::Receiver<Availability> {
        self.availability.subscribe()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// How long to wait before the next cycle.
    pub fn next_delay(&self) -> Duration {
        self.next_delay
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// First session acquisition. Fails fast on unreachable hosts and
    /// rejected credentials.
    pub async fn connect(&mut self) -> Result<(), CoreError> {
        match self.source.acquire().await {
            Ok(session) => {
                self.session = Some(session);
                info!("gateway session established");
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.availability.send_replace(Availability::Unavailable {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Register the node inventory in the store without notifying
    /// subscribers. Failure only costs the static details.
    pub async fn seed_inventory(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let nodes = self
            .source
            .fetch_inventory(session)
            .await
            .and_then(|pages| parse_node_inventory(&pages.versions, &pages.identities));

        match nodes {
            Ok(nodes) => {
                let next = reconcile::seed_inventory(&self.store.latest(), &nodes);
                info!(nodes = nodes.len(), "seeded optimizer inventory");
                self.store.seed(next);
            }
            Err(e) => warn!(error = %e, "node inventory unavailable, continuing without it"),
        }
    }

    /// Release the session, if any.
    pub fn release(&mut self) {
        if let Some(session) = self.session.take() {
            self.source.release(session);
        }
    }

    /// Run one complete cycle. Never returns an error: failures are
    /// recorded in the observable state and reported in the outcome.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.set_state(PollState::Fetching);
        let payload = match self.fetch_status().await {
            Ok(payload) => payload,
            Err(e) => return self.record_failure(e),
        };

        self.set_state(PollState::Parsing);
        let report = match self.grammar.parse(&payload) {
            Ok(report) => report,
            Err(e) => return self.record_failure(e.into()),
        };
        if !report.is_clean() {
            warn!(
                skipped = report.skipped_records,
                field_errors = report.field_errors,
                "status payload had malformed records"
            );
        }

        self.set_state(PollState::Reconciling);
        let mut next = reconcile::reconcile_report(
            &self.store.latest(),
            &report,
            payload.fetched_at,
            &self.options,
        );
        if let Some(info) = self.refresh_summary().await {
            next.gateway = Some(info);
        }
        let snapshot = self.store.publish(next);

        if self.failures > 0 {
            info!(after = self.failures, "gateway polling recovered");
        }
        self.failures = 0;
        self.next_delay = self.backoff.delay(0);
        self.availability.send_if_modified(|current| {
            let changed = *current != Availability::Available;
            *current = Availability::Available;
            changed
        });
        self.set_state(PollState::Idle);

        CycleOutcome::Published(snapshot)
    }

    pub(crate) fn set_state(&self, state: PollState) {
        self.state.send_replace(state);
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Fetch the status page, re-acquiring the session once on rejection.
    async fn fetch_status(&mut self) -> Result<RawPayload, CoreError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => self.source.acquire().await?,
        };

        match self.source.fetch_status(&session).await {
            Ok(payload) => {
                self.session = Some(session);
                Ok(payload)
            }
            Err(e) if e.is_auth_expired() => {
                debug!(error = %e, "session rejected, re-acquiring");
                self.source.release(session);
                self.set_state(PollState::AuthRetry);
                let fresh = self.source.acquire().await?;

                self.set_state(PollState::Fetching);
                match self.source.fetch_status(&fresh).await {
                    Ok(payload) => {
                        self.session = Some(fresh);
                        Ok(payload)
                    }
                    Err(e) if e.is_auth_expired() => {
                        self.source.release(fresh);
                        Err(CoreError::AuthenticationFailed {
                            message: format!("gateway rejected a freshly acquired session ({e})"),
                        })
                    }
                    Err(e) => {
                        self.session = Some(fresh);
                        Err(e.into())
                    }
                }
            }
            Err(e) => {
                self.session = Some(session);
                Err(e.into())
            }
        }
    }

    async fn refresh_summary(&mut self) -> Option<GatewayInfo> {
        if self.cycles_until_summary > 0 {
            self.cycles_until_summary -= 1;
            return None;
        }
        self.cycles_until_summary = self.summary_every_cycles.saturating_sub(1);

        let session = self.session.as_ref()?;
        let info = self
            .source
            .fetch_summary(session)
            .await
            .and_then(|payload| parse_gateway_summary(&payload));
        match info {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(error = %e, "gateway summary unavailable");
                None
            }
        }
    }

    fn record_failure(&mut self, error: CoreError) -> CycleOutcome {
        self.failures = self.failures.saturating_add(1);
        let delay = if error.is_auth() {
            self.backoff.max
        } else {
            self.backoff.delay(self.failures)
        };
        self.next_delay = delay;

        let reason = error.to_string();
        let availability = if error.is_auth()
            || (error.is_connection() && self.failures >= self.max_consecutive_failures)
        {
            Availability::Unavailable { reason }
        } else {
            Availability::Degraded { reason }
        };

        warn!(
            error = %error,
            failures = self.failures,
            delay_secs = delay.as_secs(),
            "poll cycle failed"
        );
        self.availability.send_replace(availability);
        self.set_state(PollState::Backoff {
            failures: self.failures,
            delay,
        });

        CycleOutcome::Failed {
            error,
            failures: self.failures,
            delay,
        }
    }
}
