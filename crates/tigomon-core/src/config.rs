// ── Runtime gateway configuration ──
//
// Describes *how* to reach and poll one gateway. Carries credentials and
// tuning but never touches disk; the CLI builds a `GatewayConfig` from
// its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use tigomon_api::{GatewayEndpoint, TlsMode, TransportConfig};

use crate::error::CoreError;
use crate::poller::Backoff;
use crate::reconcile::ReconcileOptions;

/// TLS verification strategy for HTTPS gateways.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed reverse proxies).
    DangerAcceptInvalid,
}

/// Configuration for polling a single gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub endpoint: GatewayEndpoint,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Delay between cycles while healthy.
    pub poll_interval: Duration,
    /// Upper bound on the failure backoff delay.
    pub max_backoff: Duration,
    /// Missed cycles before an active panel is marked stale.
    pub stale_after_misses: u32,
    /// Records the gateway reports as older than this are ignored.
    pub max_reading_age: Option<Duration>,
    /// Consecutive connection failures before the gateway is reported unavailable.
    pub max_consecutive_failures: u32,
    /// Refresh the gateway summary every N successful cycles.
    pub summary_every_cycles: u32,
}

impl GatewayConfig {
    pub fn new(endpoint: GatewayEndpoint) -> Self {
        Self {
            endpoint,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(30),
            max_backoff: Duration::from_secs(300),
            stale_after_misses: 3,
            max_reading_age: Some(Duration::from_secs(60)),
            max_consecutive_failures: 5,
            summary_every_cycles: 10,
        }
    }

    /// Reject configurations the poller cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |message: &str| -> Result<(), CoreError> {
            Err(CoreError::Config {
                message: message.to_owned(),
            })
        };

        if self.endpoint.host.trim().is_empty() {
            return invalid("gateway host is empty");
        }
        if self.timeout.is_zero() {
            return invalid("timeout must be greater than zero");
        }
        if self.poll_interval.is_zero() {
            return invalid("poll interval must be greater than zero");
        }
        if self.max_backoff < self.poll_interval {
            return invalid("max backoff must not be shorter than the poll interval");
        }
        if self.stale_after_misses == 0 {
            return invalid("stale threshold must be at least one cycle");
        }
        if self.max_consecutive_failures == 0 {
            return invalid("failure threshold must be at least one cycle");
        }
        if self.summary_every_cycles == 0 {
            return invalid("summary refresh interval must be at least one cycle");
        }
        self.endpoint.base_url()?;
        Ok(())
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            stale_after_misses: self.stale_after_misses,
            max_reading_age: self.max_reading_age,
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.poll_interval, self.max_backoff)
    }

    /// Build the [`TransportConfig`] for this gateway.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
            cookie_jar: None, // Session::acquire adds one
        }
    }
}
