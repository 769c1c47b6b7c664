//! Reactive data layer between `tigomon-api` and consumers (CLI, automation bridges).
//!
//! This crate owns the domain model, topology reconciliation, and the
//! polling lifecycle for one Tigo CCA gateway:
//!
//! - **[`Poller`]**: Facade over the whole lifecycle.
//!   [`start()`](Poller::start) validates the configuration, acquires the
//!   first session (fail-fast), seeds the optimizer inventory, then spawns
//!   the background poll loop. [`Poller::poll_once()`] runs a single cycle
//!   for one-shot CLI reads.
//!
//! - **[`reconcile()`]**: Pure function from (previous snapshot, readings,
//!   now) to the next snapshot. Devices turn stale after consecutive misses
//!   and are never deleted.
//!
//! - **[`SnapshotStore`]**: Wait-free latest-snapshot access (`ArcSwap`) plus
//!   `watch`-based notification, vended as [`SnapshotStream`].
//!
//! - **[`GatewaySource`]**: The seam between the scheduler and the network.
//!   [`HttpGateway`] is the real implementation.

pub mod config;
pub mod convert;
pub mod error;
pub mod gateway;
pub mod model;
pub mod poller;
pub mod reconcile;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{GatewayConfig, TlsVerification};
pub use error::CoreError;
pub use gateway::{GatewaySource, HttpGateway};
pub use poller::{Availability, Backoff, CycleOutcome, PollDriver, PollState, Poller};
pub use reconcile::{ReconcileOptions, reconcile, reconcile_report, seed_inventory};
pub use store::SnapshotStore;
pub use stream::{SnapshotStream, SnapshotWatchStream};

pub use model::{
    Device, DeviceStatus, Group, GroupId, NodeDetails, PanelReading, Snapshot, StableId,
};
