// ── Snapshot ──
//
// Immutable, versioned view of the whole topology. A new one is built for
// every publish; nothing mutates a snapshot once it is shared.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tigomon_api::GatewayInfo;

use super::device::{Device, DeviceStatus};
use super::stable_id::{GroupId, StableId};

/// A string of panels and its members, in device discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub members: Vec<StableId>,
}

impl Group {
    pub fn contains(&self, id: &StableId) -> bool {
        self.members.contains(id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Strictly increasing per publish. `0` means nothing has been published.
    pub version: u64,
    /// When the readings in this snapshot were fetched.
    pub captured_at: Option<DateTime<Utc>>,
    /// `false` when the cycle only managed a partial read.
    pub poll_succeeded: bool,
    pub devices: IndexMap<StableId, Device>,
    pub groups: IndexMap<GroupId, Group>,
    pub gateway: Option<GatewayInfo>,
    /// Soft per-record anomalies seen in the producing cycle.
    pub anomalies: u32,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn device(&self, id: &StableId) -> Option<&Device> {
        self.devices.get(id)
    }

    /// Look up by the gateway's own key (MAC in any notation, or label key).
    pub fn device_by_key(&self, key: &str) -> Option<&Device> {
        self.devices.get(&StableId::from_device_key(key))
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(&GroupId::from(name))
    }

    /// Devices in a group, in membership order.
    pub fn group_devices<'a>(&'a self, group: &'a Group) -> impl Iterator<Item = &'a Device> {
        group.members.iter().filter_map(|id| self.devices.get(id))
    }

    pub fn count_by_status(&self, status: DeviceStatus) -> usize {
        self.devices.values().filter(|d| d.status == status).count()
    }

    pub fn active_count(&self) -> usize {
        self.count_by_status(DeviceStatus::Active)
    }

    /// Sum of the last reported output power of active devices, in watts.
    pub fn total_power(&self) -> f64 {
        self.devices
            .values()
            .filter(|d| d.is_active())
            .filter_map(Device::power)
            .sum()
    }
}
