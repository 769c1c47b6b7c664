// Payload parsing
//
// Converts raw gateway pages into typed intermediate records at the
// boundary, so everything downstream works on typed data only. The status
// page grammar is pluggable: firmware revisions are expected to drift.

mod html;
mod inventory;
mod mesh_table;
mod summary;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Error;
use crate::fetch::RawPayload;

pub use inventory::{NodeInfo, parse_node_inventory};
pub use mesh_table::{ColumnMap, MeshTableGrammar, group_from_label};
pub use summary::{GatewayInfo, parse_gateway_summary};

/// One optimizer record extracted from a status payload.
///
/// Numeric fields are `None` when the gateway printed `n/a` or something
/// that did not parse; the record itself survives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawReading {
    /// Vendor-local identifier: the MAC cell, or the label when no MAC is printed.
    pub device_key: String,
    pub label: Option<String>,
    pub mac: Option<String>,
    pub voltage_in: Option<f64>,
    pub voltage_out: Option<f64>,
    pub current: Option<f64>,
    pub power: Option<f64>,
    pub pwm: Option<u32>,
    pub temperature: Option<f64>,
    /// Raw status bitmap (printed as hex by the gateway).
    pub status_bits: Option<u32>,
    pub rssi: Option<i32>,
    /// String / group the gateway (or the label) places this optimizer in.
    pub group_hint: Option<String>,
    /// How old the gateway says this record is.
    pub age: Option<Duration>,
    /// `fetched_at - age`.
    pub captured_at: DateTime<Utc>,
}

/// Result of parsing one status payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    /// Records in payload order.
    pub readings: Vec<RawReading>,
    /// Rows dropped because no device key could be recovered.
    pub skipped_records: u32,
    /// Individual fields that were present but unparsable.
    pub field_errors: u32,
}

impl ParseReport {
    /// Total soft anomalies seen while parsing.
    pub fn anomalies(&self) -> u32 {
        self.skipped_records + self.field_errors
    }

    pub fn is_clean(&self) -> bool {
        self.anomalies() == 0
    }
}

/// A versioned status page grammar.
///
/// Implementations must be tolerant: malformed rows are skipped and
/// counted, and [`Error::Parse`] is reserved for payloads whose envelope
/// is not recognizable at all. Zero records is a valid result.
pub trait PayloadGrammar: Send + Sync {
    /// Short identifier, e.g. `"mesh-table/v1"`.
    fn name(&self) -> &str;

    fn parse(&self, payload: &RawPayload) -> Result<ParseReport, Error>;
}
