// ── Optimizer domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::stable_id::{GroupId, StableId};

/// Lifecycle of an optimizer in the topology.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceStatus {
    /// Reported a fresh reading recently.
    Active,
    /// Missed enough consecutive cycles to be considered gone.
    Stale,
    /// Known from the node inventory, never reported a reading.
    #[default]
    Unknown,
}

/// The electrical readings of one optimizer at one point in time.
///
/// Every numeric field is optional: `None` means the gateway did not
/// report a usable value, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelReading {
    pub voltage_in: Option<f64>,
    pub voltage_out: Option<f64>,
    pub current: Option<f64>,
    pub power: Option<f64>,
    /// Duty cycle, 0..=255.
    pub pwm: Option<u32>,
    pub temperature: Option<f64>,
    pub status_bits: Option<u32>,
    pub rssi: Option<i32>,
    pub captured_at: DateTime<Utc>,
}

/// Static facts from the node inventory pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDetails {
    pub firmware: Option<String>,
    pub hardware: Option<String>,
    pub model: String,
}

/// One panel optimizer as tracked across poll cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub stable_id: StableId,
    /// The gateway's own key (MAC or label) this device was first seen under.
    pub device_key: String,
    pub label: Option<String>,
    pub mac: Option<String>,
    pub group_id: Option<GroupId>,
    pub status: DeviceStatus,
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Retained while stale; replaced only by a newer reading of this device.
    pub last_reading: Option<PanelReading>,
    pub consecutive_misses: u32,
    pub details: Option<NodeDetails>,
}

impl Device {
    /// A device that has not reported yet.
    pub fn new(stable_id: StableId, device_key: impl Into<String>) -> Self {
        Self {
            stable_id,
            device_key: device_key.into(),
            label: None,
            mac: None,
            group_id: None,
            status: DeviceStatus::Unknown,
            last_seen_at: None,
            last_reading: None,
            consecutive_misses: 0,
            details: None,
        }
    }

    /// Label if the gateway has one, else the raw key.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.device_key)
    }

    pub fn is_active(&self) -> bool {
        self.status == DeviceStatus::Active
    }

    /// Last reported output power in watts.
    pub fn power(&self) -> Option<f64> {
        self.last_reading.as_ref().and_then(|r| r.power)
    }
}
