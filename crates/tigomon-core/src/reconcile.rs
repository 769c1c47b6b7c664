// ── Topology reconciler ──
//
// Merges one cycle's readings into the previous snapshot and returns the
// next one. Pure: the previous snapshot is never mutated, so the caller
// can publish the result with a single pointer swap.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tigomon_api::{NodeInfo, ParseReport, RawReading, group_from_label};
use tracing::{debug, info, warn};

use crate::model::{
    Device, DeviceStatus, Group, GroupId, NodeDetails, PanelReading, Snapshot, StableId,
};

/// Tuning for stale detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Consecutive missed cycles after which an active device turns stale.
    pub stale_after_misses: u32,
    /// Readings the gateway reports as older than this count as a miss.
    pub max_reading_age: Option<Duration>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            stale_after_misses: 3,
            max_reading_age: Some(Duration::from_secs(60)),
        }
    }
}

/// Build the next snapshot from `prev` and this cycle's readings.
///
/// Devices are never removed. A device absent this cycle (or present only
/// with an outdated record) accrues a miss and keeps its last reading.
/// Duplicate keys within one batch resolve last-write-wins and are counted
/// in `anomalies`.
pub fn reconcile(
    prev: &Snapshot,
    readings: &[RawReading],
    now: DateTime<Utc>,
    options: &ReconcileOptions,
) -> Snapshot {
    let mut devices = prev.devices.clone();
    let mut seen: HashSet<StableId> = HashSet::with_capacity(readings.len());
    let mut duplicates = 0u32;

    for raw in readings {
        let id = StableId::from_device_key(&raw.device_key);
        let is_outdated = options
            .max_reading_age
            .zip(raw.age)
            .is_some_and(|(max, age)| age > max);

        if seen.contains(&id) {
            duplicates += 1;
            warn!(device = %id, key = %raw.device_key, "duplicate device key in payload");
        }

        adopt_label_keyed(&mut devices, &id, raw);
        let device = devices
            .entry(id.clone())
            .or_insert_with(|| Device::new(id.clone(), raw.device_key.clone()));
        refresh_identity(device, raw);

        if is_outdated {
            debug!(device = %id, age = ?raw.age, "ignoring outdated reading");
            continue;
        }

        seen.insert(id.clone());
        match device.status {
            DeviceStatus::Unknown if device.last_reading.is_none() => {
                info!(device = %id, name = device.display_name(), "discovered panel");
            }
            DeviceStatus::Stale => {
                info!(device = %id, name = device.display_name(), "panel reporting again");
            }
            _ => {}
        }
        device.last_reading = Some(PanelReading::from(raw));
        device.last_seen_at = Some(now);
        device.status = DeviceStatus::Active;
        device.consecutive_misses = 0;
    }

    for (id, device) in &mut devices {
        if seen.contains(id) || device.last_reading.is_none() {
            continue;
        }
        device.consecutive_misses = device.consecutive_misses.saturating_add(1);
        if device.status == DeviceStatus::Active
            && device.consecutive_misses >= options.stale_after_misses
        {
            info!(
                device = %id,
                name = device.display_name(),
                misses = device.consecutive_misses,
                "panel went stale"
            );
            device.status = DeviceStatus::Stale;
        }
    }

    let groups = rebuild_groups(&devices);

    Snapshot {
        version: prev.version + 1,
        captured_at: Some(now),
        poll_succeeded: true,
        devices,
        groups,
        gateway: prev.gateway.clone(),
        anomalies: duplicates,
    }
}

/// [`reconcile`] for a whole parse result.
///
/// A cycle that had to skip records is partial: `poll_succeeded` is false.
/// Field-level errors are counted but do not make the cycle partial.
pub fn reconcile_report(
    prev: &Snapshot,
    report: &ParseReport,
    now: DateTime<Utc>,
    options: &ReconcileOptions,
) -> Snapshot {
    let mut next = reconcile(prev, &report.readings, now, options);
    next.anomalies = next.anomalies.saturating_add(report.anomalies());
    next.poll_succeeded = report.skipped_records == 0;
    next
}

/// Register inventory nodes and attach their static details.
///
/// Nodes not yet seen in a status table enter as [`DeviceStatus::Unknown`].
pub fn seed_inventory(prev: &Snapshot, nodes: &[NodeInfo]) -> Snapshot {
    let mut devices = prev.devices.clone();

    for node in nodes {
        let id = StableId::from_device_key(node.device_key());
        let device = devices.entry(id.clone()).or_insert_with(|| {
            debug!(device = %id, label = %node.label, "registering inventory node");
            Device::new(id.clone(), node.device_key())
        });
        if device.label.is_none() {
            device.label = Some(node.label.clone());
        }
        if device.mac.is_none() {
            device.mac.clone_from(&node.mac);
        }
        if device.group_id.is_none() {
            device.group_id = group_from_label(&node.label).map(GroupId::from);
        }
        device.details = Some(NodeDetails::from(node));
    }

    Snapshot {
        version: prev.version + 1,
        groups: rebuild_groups(&devices),
        devices,
        ..prev.clone()
    }
}

/// Latest label/MAC/group from a record. A record without a group hint
/// leaves the previous assignment in place.
fn refresh_identity(device: &mut Device, raw: &RawReading) {
    if raw.label.is_some() {
        device.label.clone_from(&raw.label);
    }
    if raw.mac.is_some() {
        device.mac.clone_from(&raw.mac);
    }
    if let Some(hint) = &raw.group_hint {
        let group = GroupId::from(hint.as_str());
        if device.group_id.as_ref().is_some_and(|g| *g != group) {
            info!(device = %device.stable_id, to = %group, "panel moved to another string");
        }
        device.group_id = Some(group);
    }
}

/// Fold an inventory node registered under its label into the MAC-keyed
/// device reporting that label, so one panel never appears twice.
///
/// Only nodes that never reported are folded; a label-keyed device with
/// readings of its own is a separate panel.
fn adopt_label_keyed(devices: &mut IndexMap<StableId, Device>, id: &StableId, raw: &RawReading) {
    let Some(label) = raw.label.as_deref() else {
        return;
    };
    if !id.is_mac() {
        return;
    }
    let label_id = StableId::from_device_key(label);
    if label_id.is_mac()
        || devices
            .get(&label_id)
            .is_none_or(|d| d.last_reading.is_some())
    {
        return;
    }
    let Some(mut ghost) = devices.shift_remove(&label_id) else {
        return;
    };

    debug!(device = %id, from = %label_id, "merging label-keyed inventory node");
    match devices.get_mut(id) {
        Some(device) => {
            if device.details.is_none() {
                device.details = ghost.details;
            }
            if device.group_id.is_none() {
                device.group_id = ghost.group_id;
            }
        }
        None => {
            ghost.stable_id = id.clone();
            ghost.device_key.clone_from(&raw.device_key);
            devices.insert(id.clone(), ghost);
        }
    }
}

/// Derive group membership from every device's current assignment, so a
/// device can only leave a group by being assigned to another one.
fn rebuild_groups(devices: &IndexMap<StableId, Device>) -> IndexMap<GroupId, Group> {
    let mut groups: IndexMap<GroupId, Group> = IndexMap::new();
    for (id, device) in devices {
        let Some(group_id) = &device.group_id else {
            continue;
        };
        groups
            .entry(group_id.clone())
            .or_insert_with(|| Group {
                id: group_id.clone(),
                members: Vec::new(),
            })
            .members
            .push(id.clone());
    }
    groups
}
