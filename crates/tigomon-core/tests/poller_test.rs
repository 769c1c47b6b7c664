#![allow(clippy::unwrap_used)]
// Integration tests for the poll scheduler using a scripted in-memory gateway.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;

use tigomon_api::{
    Error, GatewayEndpoint, InventoryPages, MeshTableGrammar, PayloadGrammar, RawPayload,
};
use tigomon_core::{
    Availability, CoreError, CycleOutcome, DeviceStatus, GatewayConfig, GatewaySource,
    PollDriver, PollState, Poller, SnapshotStore,
};

// ── Scripted gateway ────────────────────────────────────────────────

#[derive(Default)]
struct Script {
    acquires: VecDeque<Result<(), Error>>,
    statuses: VecDeque<Result<String, Error>>,
    default_status: Option<String>,
    summary: Option<String>,
    inventory: Option<(String, String)>,
}

#[derive(Default)]
struct Counters {
    acquires: AtomicU32,
    releases: AtomicU32,
    fetches: AtomicU32,
    panic_on_fetch: AtomicBool,
}

#[derive(Clone)]
struct ScriptedGateway {
    script: Arc<Mutex<Script>>,
    counters: Arc<Counters>,
}

impl ScriptedGateway {
    fn new(default_status: String) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                default_status: Some(default_status),
                ..Script::default()
            })),
            counters: Arc::new(Counters::default()),
        }
    }

    fn push_acquire(&self, reply: Result<(), Error>) {
        self.script.lock().unwrap().acquires.push_back(reply);
    }

    fn push_status(&self, reply: Result<String, Error>) {
        self.script.lock().unwrap().statuses.push_back(reply);
    }

    fn acquires(&self) -> u32 {
        self.counters.acquires.load(Ordering::SeqCst)
    }

    fn releases(&self) -> u32 {
        self.counters.releases.load(Ordering::SeqCst)
    }

    fn fetches(&self) -> u32 {
        self.counters.fetches.load(Ordering::SeqCst)
    }
}

fn payload(body: String, path: &str) -> RawPayload {
    RawPayload::new(body, Utc::now(), path)
}

fn not_found(path: &str) -> Error {
    Error::MalformedResponse {
        path: path.into(),
        message: "HTTP 404 Not Found".into(),
    }
}

impl GatewaySource for ScriptedGateway {
    type Session = u32;

    async fn acquire(&self) -> Result<u32, Error> {
        let n = self.counters.acquires.fetch_add(1, Ordering::SeqCst) + 1;
        let reply = self.script.lock().unwrap().acquires.pop_front();
        reply.unwrap_or(Ok(())).map(|()| n)
    }

    async fn fetch_status(&self, _session: &u32) -> Result<RawPayload, Error> {
        self.counters.fetches.fetch_add(1, Ordering::SeqCst);
        assert!(
            !self.counters.panic_on_fetch.load(Ordering::SeqCst),
            "scripted status fetch failure"
        );
        let mut script = self.script.lock().unwrap();
        let reply = match script.statuses.pop_front() {
            Some(reply) => reply,
            None => Ok(script.default_status.clone().unwrap()),
        };
        reply.map(|body| payload(body, "/cgi-bin/meshdatapower"))
    }

    async fn fetch_summary(&self, _session: &u32) -> Result<RawPayload, Error> {
        let summary = self.script.lock().unwrap().summary.clone();
        summary
            .map(|body| payload(body, "/cgi-bin/lmudui"))
            .ok_or_else(|| not_found("/cgi-bin/lmudui"))
    }

    async fn fetch_inventory(&self, _session: &u32) -> Result<InventoryPages, Error> {
        let inventory = self.script.lock().unwrap().inventory.clone();
        inventory
            .map(|(versions, identities)| InventoryPages {
                versions: payload(versions, "/cgi-bin/meshnodever"),
                identities: payload(identities, "/cgi-bin/meshnodeinfo"),
            })
            .ok_or_else(|| not_found("/cgi-bin/meshnodever"))
    }

    fn release(&self, _session: u32) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// A status table with one row per `(mac, label)`.
fn status_page(panels: &[(&str, &str)]) -> String {
    let rows: String = panels
        .iter()
        .map(|(mac, label)| {
            let mut cells = vec![String::from("1"); 23];
            cells[1] = (*mac).into();
            cells[2] = (*label).into();
            cells[3] = "5 sec".into();
            cells[15] = "240.0".into();
            let tds: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
            format!("<tr>{tds}</tr>")
        })
        .collect();
    format!("<html><table class=\"list_tb\">{rows}</table></html>")
}

fn three_panels() -> String {
    status_page(&[
        ("04C05B300001", "A1"),
        ("04C05B300002", "A2"),
        ("04C05B300003", "A3"),
    ])
}

fn refused() -> Error {
    Error::ConnectionRefused {
        url: "http://192.168.1.125/cgi-bin/meshdatapower".into(),
        reason: "connection refused".into(),
    }
}

fn grammar() -> Arc<dyn PayloadGrammar> {
    Arc::new(MeshTableGrammar::default())
}

fn config() -> GatewayConfig {
    GatewayConfig::new(GatewayEndpoint::new("192.168.1.125"))
}

async fn connected_driver(gateway: &ScriptedGateway) -> PollDriver<ScriptedGateway> {
    let store = Arc::new(SnapshotStore::new());
    let mut driver = PollDriver::new(&config(), gateway.clone(), grammar(), store);
    driver.connect().await.unwrap();
    driver
}

fn failure_delay(outcome: &CycleOutcome) -> Duration {
    match outcome {
        CycleOutcome::Failed { delay, .. } => *delay,
        CycleOutcome::Published(_) => panic!("expected a failed cycle"),
    }
}

// ── Cycle driver ────────────────────────────────────────────────────

#[tokio::test]
async fn test_successful_cycle_publishes_topology() {
    let gateway = ScriptedGateway::new(three_panels());
    let mut driver = connected_driver(&gateway).await;

    let outcome = driver.run_cycle().await;
    let CycleOutcome::Published(snapshot) = outcome else {
        panic!("expected publish, got {outcome:?}");
    };

    assert_eq!(snapshot.version, 1);
    assert!(snapshot.poll_succeeded);
    assert_eq!(snapshot.active_count(), 3);
    assert_eq!(snapshot.group("A").unwrap().members.len(), 3);
    assert_eq!(driver.state(), PollState::Idle);
    assert_eq!(driver.availability(), Availability::Available);
    assert_eq!(driver.next_delay(), Duration::from_secs(30));
}

#[tokio::test]
async fn test_connection_failures_pin_snapshot_and_grow_backoff() {
    let gateway = ScriptedGateway::new(three_panels());
    let mut driver = connected_driver(&gateway).await;
    assert!(driver.run_cycle().await.is_published());
    let pinned = driver.store().latest();

    for _ in 0..3 {
        gateway.push_status(Err(refused()));
    }

    let delays: Vec<Duration> = {
        let mut delays = Vec::new();
        for _ in 0..3 {
            delays.push(failure_delay(&driver.run_cycle().await));
            assert!(Arc::ptr_eq(&driver.store().latest(), &pinned));
        }
        delays
    };

    assert_eq!(
        delays,
        vec![
            Duration::from_secs(60),
            Duration::from_secs(120),
            Duration::from_secs(240),
        ]
    );
    assert_eq!(driver.consecutive_failures(), 3);
    assert!(matches!(driver.availability(), Availability::Degraded { .. }));
    assert_eq!(
        driver.state(),
        PollState::Backoff {
            failures: 3,
            delay: Duration::from_secs(240),
        }
    );

    // First success resets to the base interval.
    let outcome = driver.run_cycle().await;
    assert!(outcome.is_published());
    assert_eq!(driver.consecutive_failures(), 0);
    assert_eq!(driver.next_delay(), Duration::from_secs(30));
    assert_eq!(driver.availability(), Availability::Available);
    assert_eq!(driver.store().latest().version, pinned.version + 1);
}

#[tokio::test]
async fn test_sustained_connection_failures_escalate() {
    let gateway = ScriptedGateway::new(three_panels());
    let mut driver = connected_driver(&gateway).await;

    for _ in 0..5 {
        gateway.push_status(Err(refused()));
    }
    for cycle in 1..=5 {
        let delay = failure_delay(&driver.run_cycle().await);
        assert!(delay <= Duration::from_secs(300));
        if cycle < 5 {
            assert!(matches!(driver.availability(), Availability::Degraded { .. }));
        }
    }
    assert!(matches!(
        driver.availability(),
        Availability::Unavailable { .. }
    ));
    assert_eq!(driver.next_delay(), Duration::from_secs(300));
    // Nothing was ever published.
    assert_eq!(driver.store().latest().version, 0);
}

#[tokio::test]
async fn test_unauthorized_reacquires_once_then_succeeds() {
    let gateway = ScriptedGateway::new(three_panels());
    let mut driver = connected_driver(&gateway).await;
    gateway.push_status(Err(Error::Unauthorized { status: 401 }));

    let outcome = driver.run_cycle().await;

    assert!(outcome.is_published(), "got {outcome:?}");
    assert_eq!(gateway.acquires(), 2);
    assert_eq!(gateway.releases(), 1);
    assert_eq!(gateway.fetches(), 2);
    assert!(driver.has_session());
}

#[tokio::test]
async fn test_second_unauthorized_escalates_to_auth_error() {
    let gateway = ScriptedGateway::new(three_panels());
    let mut driver = connected_driver(&gateway).await;
    gateway.push_status(Err(Error::Unauthorized { status: 401 }));
    gateway.push_status(Err(Error::Unauthorized { status: 303 }));

    let outcome = driver.run_cycle().await;

    match &outcome {
        CycleOutcome::Failed { error, .. } => assert!(error.is_auth(), "got {error:?}"),
        CycleOutcome::Published(_) => panic!("expected auth failure"),
    }
    assert_eq!(gateway.acquires(), 2, "exactly one re-acquisition");
    assert_eq!(gateway.fetches(), 2);
    assert!(!driver.has_session());
    assert!(matches!(
        driver.availability(),
        Availability::Unavailable { .. }
    ));
    assert_eq!(driver.next_delay(), Duration::from_secs(300));
}

#[tokio::test]
async fn test_rejected_reacquisition_is_auth_error() {
    let gateway = ScriptedGateway::new(three_panels());
    let mut driver = connected_driver(&gateway).await;
    gateway.push_status(Err(Error::Unauthorized { status: 401 }));
    gateway.push_acquire(Err(Error::Authentication {
        message: "credentials rejected (HTTP 401)".into(),
    }));

    let outcome = driver.run_cycle().await;

    assert!(matches!(
        outcome,
        CycleOutcome::Failed {
            error: CoreError::AuthenticationFailed { .. },
            ..
        }
    ));
    assert_eq!(gateway.fetches(), 1);
}

#[tokio::test]
async fn test_unrecognized_payload_degrades_without_publishing() {
    let gateway = ScriptedGateway::new(three_panels());
    let mut driver = connected_driver(&gateway).await;
    gateway.push_status(Ok("<html><body>Please log in</body></html>".into()));

    let outcome = driver.run_cycle().await;

    assert!(matches!(
        outcome,
        CycleOutcome::Failed {
            error: CoreError::Parse { .. },
            failures: 1,
            ..
        }
    ));
    assert!(matches!(driver.availability(), Availability::Degraded { .. }));
    assert_eq!(driver.store().latest().version, 0);
}

#[tokio::test]
async fn test_vanishing_panel_goes_stale_after_three_cycles() {
    let gateway = ScriptedGateway::new(status_page(&[("04C05B300001", "A1")]));
    let mut driver = connected_driver(&gateway).await;
    gateway.push_status(Ok(three_panels()));

    assert!(driver.run_cycle().await.is_published());
    for _ in 0..2 {
        driver.run_cycle().await;
    }
    let snap = driver.store().latest();
    assert_eq!(
        snap.device_by_key("04C05B300002").unwrap().status,
        DeviceStatus::Active
    );

    driver.run_cycle().await;
    let snap = driver.store().latest();
    assert_eq!(
        snap.device_by_key("04C05B300002").unwrap().status,
        DeviceStatus::Stale
    );
    assert_eq!(snap.devices.len(), 3);
    assert_eq!(snap.group("A").unwrap().members.len(), 3);
}

// ── Poller lifecycle ────────────────────────────────────────────────

#[tokio::test]
async fn test_start_fails_fast_on_rejected_credentials() {
    let gateway = ScriptedGateway::new(three_panels());
    gateway.push_acquire(Err(Error::Authentication {
        message: "credentials rejected (HTTP 401)".into(),
    }));

    let result = Poller::start(&config(), gateway, grammar()).await;
    assert!(matches!(result, Err(CoreError::AuthenticationFailed { .. })));
}

#[tokio::test]
async fn test_start_rejects_invalid_config() {
    let gateway = ScriptedGateway::new(three_panels());
    let cfg = GatewayConfig::new(GatewayEndpoint::new(" "));

    let result = Poller::start(&cfg, gateway.clone(), grammar()).await;
    assert!(matches!(result, Err(CoreError::Config { .. })));
    assert_eq!(gateway.acquires(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_poller_publishes_each_cycle_and_shuts_down() {
    let gateway = ScriptedGateway::new(three_panels());
    let poller = Poller::start(&config(), gateway.clone(), grammar())
        .await
        .unwrap();
    let mut sub = poller.subscribe();

    let first = loop {
        let snap = sub.changed().await.unwrap();
        if !snap.is_empty() {
            break snap;
        }
    };
    assert_eq!(first.active_count(), 3);

    // Paused time auto-advances through the poll interval.
    let second = sub.changed().await.unwrap();
    assert_eq!(second.version, first.version + 1);

    poller.shutdown().await;
    assert_eq!(poller.state(), PollState::Stopped);
    assert!(!poller.is_running());
    assert_eq!(gateway.releases(), 1);
    assert_eq!(poller.latest().version, second.version);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_backoff_wait() {
    let gateway = ScriptedGateway::new(three_panels());
    for _ in 0..10 {
        gateway.push_status(Err(refused()));
    }
    let poller = Poller::start(&config(), gateway.clone(), grammar())
        .await
        .unwrap();

    let mut state = poller.subscribe_state();
    state
        .wait_for(|s| matches!(s, PollState::Backoff { .. }))
        .await
        .unwrap();

    poller.shutdown().await;
    assert_eq!(poller.state(), PollState::Stopped);
    assert_eq!(poller.latest().version, 0);
    assert_eq!(gateway.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_inventory_seed_wakes_no_subscriber() {
    let gateway = ScriptedGateway::new(three_panels());
    gateway.script.lock().unwrap().inventory = Some((
        "<table class=\"list_tb\"></table>".into(),
        "<table class=\"list_tb\"><tr><td>1</td><td>04C05B300009</td><td>B9</td></tr></table>"
            .into(),
    ));
    let mut driver = connected_driver(&gateway).await;
    let mut sub = driver.store().subscribe();

    driver.seed_inventory().await;
    assert_eq!(sub.latest().devices.len(), 1);
    assert!(sub.latest().captured_at.is_none());
    assert!(
        tokio::time::timeout(Duration::from_secs(1), sub.changed())
            .await
            .is_err()
    );

    assert!(driver.run_cycle().await.is_published());
    let snap = sub.changed().await.unwrap();
    assert!(snap.captured_at.is_some());
    assert_eq!(snap.devices.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_dead_poll_loop_is_not_running() {
    let gateway = ScriptedGateway::new(three_panels());
    gateway.counters.panic_on_fetch.store(true, Ordering::SeqCst);
    let poller = Poller::start(&config(), gateway.clone(), grammar())
        .await
        .unwrap();
    assert!(poller.is_running());

    // The loop owns the state sender; the channel closes when it dies.
    let mut state = poller.subscribe_state();
    while state.changed().await.is_ok() {}

    assert!(!poller.is_running());
    poller.shutdown().await;
    assert_eq!(poller.latest().version, 0);
}

#[tokio::test]
async fn test_poll_once_includes_inventory_and_summary() {
    let gateway = ScriptedGateway::new(three_panels());
    {
        let mut script = gateway.script.lock().unwrap();
        script.summary = Some(
            "<table><tr><td>CC Temperature</td><td>44.0 C</td></tr>\
             <tr><td>Firmware Version</td><td>3.7.1-ct</td></tr></table>"
                .into(),
        );
        script.inventory = Some((
            "<table class=\"list_tb\"><tr><td>1</td><td>A1</td><td></td><td></td><td></td>\
             <td></td><td>3.6.3</td><td></td><td>MLPE-461</td></tr></table>"
                .into(),
            "<table class=\"list_tb\"><tr><td>1</td><td>04C05B300001</td><td>A1</td></tr>\
             <tr><td>2</td><td>04C05B300009</td><td>B9</td></tr></table>"
                .into(),
        ));
    }

    let snapshot = Poller::poll_once(&config(), gateway.clone(), grammar())
        .await
        .unwrap();

    let gateway_info = snapshot.gateway.as_ref().unwrap();
    assert_eq!(gateway_info.temperature, Some(44.0));
    assert_eq!(gateway_info.firmware.as_deref(), Some("3.7.1-ct"));

    let a1 = snapshot.device_by_key("04C05B300001").unwrap();
    assert!(a1.is_active());
    assert_eq!(a1.details.as_ref().unwrap().model, "TS4-A-O");

    // Inventory-only node that never reported.
    let b9 = snapshot.device_by_key("04C05B300009").unwrap();
    assert_eq!(b9.status, DeviceStatus::Unknown);
    assert_eq!(snapshot.devices.len(), 4);
    assert_eq!(gateway.releases(), 1);
}

#[tokio::test]
async fn test_poll_once_surfaces_cycle_error() {
    let gateway = ScriptedGateway::new(three_panels());
    gateway.push_status(Err(refused()));

    let err = Poller::poll_once(&config(), gateway, grammar())
        .await
        .unwrap_err();
    assert!(err.is_connection(), "got {err:?}");
}
