//! Status command: one poll cycle, every optimizer.

use std::fmt::Write as _;
use std::sync::Arc;

use tabled::Tabled;

use tigomon_api::MeshTableGrammar;
use tigomon_core::{Device, DeviceStatus, HttpGateway, Poller, Snapshot};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PanelRow {
    #[tabled(rename = "Panel")]
    label: String,
    #[tabled(rename = "String")]
    group: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Vin")]
    voltage_in: String,
    #[tabled(rename = "Vout")]
    voltage_out: String,
    #[tabled(rename = "A")]
    current: String,
    #[tabled(rename = "W")]
    power: String,
    #[tabled(rename = "RSSI")]
    rssi: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

impl PanelRow {
    fn new(d: &Device, color: bool) -> Self {
        let reading = d.last_reading.as_ref();
        Self {
            label: d.display_name().to_owned(),
            group: d
                .group_id
                .as_ref()
                .map_or_else(|| "-".into(), ToString::to_string),
            status: output::paint_status(d.status, color),
            voltage_in: output::fmt_opt(reading.and_then(|r| r.voltage_in), 2),
            voltage_out: output::fmt_opt(reading.and_then(|r| r.voltage_out), 2),
            current: output::fmt_opt(reading.and_then(|r| r.current), 2),
            power: output::fmt_opt(reading.and_then(|r| r.power), 1),
            rssi: reading
                .and_then(|r| r.rssi)
                .map_or_else(|| "-".into(), |v| v.to_string()),
            last_seen: d.last_seen_at.map_or_else(
                || "never".into(),
                |t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string(),
            ),
        }
    }
}

// ── Rendering (shared with watch) ───────────────────────────────────

/// Devices to show, optionally restricted to one string.
pub fn visible_devices<'a>(snap: &'a Snapshot, group: Option<&str>) -> Vec<&'a Device> {
    match group {
        None => snap.devices.values().collect(),
        Some(name) => snap
            .group(name)
            .map(|g| snap.group_devices(g).collect())
            .unwrap_or_default(),
    }
}

fn summary_line(snap: &Snapshot) -> String {
    format!(
        "{} active, {} stale, {} unknown | {:.1} W{}",
        snap.active_count(),
        snap.count_by_status(DeviceStatus::Stale),
        snap.count_by_status(DeviceStatus::Unknown),
        snap.total_power(),
        if snap.anomalies > 0 {
            format!(" | {} malformed records", snap.anomalies)
        } else {
            String::new()
        }
    )
}

/// Render a snapshot in the selected format.
pub fn render_snapshot(
    snap: &Snapshot,
    group: Option<&str>,
    global: &GlobalOpts,
    color: bool,
) -> String {
    let devices = visible_devices(snap, group);
    output::render_single(
        &global.output,
        snap,
        |s| {
            let rows: Vec<PanelRow> = devices.iter().map(|d| PanelRow::new(d, color)).collect();
            let mut out = output::render_table(&rows);
            let _ = write!(out, "\n{}", summary_line(s));
            out
        },
        |_| {
            devices
                .iter()
                .map(|d| format!("{}\t{}", d.display_name(), output::fmt_opt(d.power(), 1)))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    resolved: &Resolved,
    args: &StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let source = HttpGateway::from_config(&resolved.gateway);
    let grammar = Arc::new(MeshTableGrammar::default());

    let snap = Poller::poll_once(&resolved.gateway, source, grammar)
        .await
        .map_err(|e| CliError::from(e).for_profile(&resolved.profile_name))?;

    let color = output::should_color(&global.color);
    let out = render_snapshot(&snap, args.group.as_deref(), global, color);
    output::print_output(&out, global.quiet);
    Ok(())
}
