// ── Observable scheduler state ──

use std::time::Duration;

use serde::Serialize;
use strum::Display;

/// Where the poll loop is in its cycle.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PollState {
    Idle,
    Fetching,
    /// Session was rejected; acquiring a fresh one before retrying.
    AuthRetry,
    Parsing,
    Reconciling,
    /// Waiting out a failure before the next attempt.
    Backoff { failures: u32, delay: Duration },
    Stopped,
}

/// What the consumer should show for this gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "availability", rename_all = "snake_case")]
pub enum Availability {
    Available,
    /// Recent cycles failed but data is still considered usable.
    Degraded { reason: String },
    /// Credentials rejected, or the gateway has been unreachable too long.
    Unavailable { reason: String },
}
