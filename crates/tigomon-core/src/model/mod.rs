// ── Domain model ──
//
// Canonical types built by the reconciler and handed to consumers.

pub mod device;
pub mod snapshot;
pub mod stable_id;

pub use device::{Device, DeviceStatus, NodeDetails, PanelReading};
pub use snapshot::{Group, Snapshot};
pub use stable_id::{GroupId, StableId};
