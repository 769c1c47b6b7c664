// `meshdatapower` table grammar
//
// The status page is one `<table class="list_tb">` with a row per
// optimizer. Columns are positional and have shifted between firmware
// releases, so the layout lives in a `ColumnMap`.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::html::{self, HtmlTable};
use super::{ParseReport, PayloadGrammar, RawReading};
use crate::error::Error;
use crate::fetch::RawPayload;

const TABLE_CLASS: &str = "list_tb";

/// 1-based column positions of each field in the status table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub mac: usize,
    pub label: usize,
    pub age: usize,
    pub voltage_in: usize,
    pub voltage_out: usize,
    pub current: usize,
    pub power: usize,
    pub pwm: usize,
    pub temperature: usize,
    pub status: usize,
    pub rssi: usize,
    /// Explicit string/group column, when the firmware prints one.
    pub group: Option<usize>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            mac: 2,
            label: 3,
            age: 4,
            voltage_in: 13,
            voltage_out: 14,
            current: 15,
            power: 16,
            pwm: 17,
            temperature: 18,
            status: 22,
            rssi: 23,
            group: None,
        }
    }
}

/// Grammar for the positional `meshdatapower` status table.
#[derive(Debug, Clone, Default)]
pub struct MeshTableGrammar {
    columns: ColumnMap,
}

impl MeshTableGrammar {
    pub fn new(columns: ColumnMap) -> Self {
        Self { columns }
    }

    fn parse_table(&self, table: &HtmlTable, payload: &RawPayload) -> ParseReport {
        let mut report = ParseReport::default();

        for (idx, cells) in table.rows.iter().enumerate() {
            let mut row = Row {
                cells,
                field_errors: 0,
            };
            match self.parse_row(&mut row, payload) {
                Some(reading) => report.readings.push(reading),
                None => {
                    debug!(row = idx, "dropping status row without a device key");
                    report.skipped_records += 1;
                }
            }
            report.field_errors += row.field_errors;
        }

        report
    }

    fn parse_row(&self, row: &mut Row<'_>, payload: &RawPayload) -> Option<RawReading> {
        let cols = &self.columns;
        let mac = row.text(cols.mac);
        let label = row.text(cols.label);
        let device_key = mac.clone().or_else(|| label.clone())?;

        let age = row.text(cols.age).and_then(|raw| {
            let parsed = parse_age(&raw);
            if parsed.is_none() {
                row.field_errors += 1;
            }
            parsed
        });
        // An age reaching past chrono's range keeps the record but pins its
        // capture time to the earliest instant; the age itself marks it outdated.
        let captured_at = match age {
            None => payload.fetched_at,
            Some(a) => TimeDelta::from_std(a)
                .ok()
                .and_then(|delta| payload.fetched_at.checked_sub_signed(delta))
                .unwrap_or_else(|| {
                    row.field_errors += 1;
                    DateTime::<Utc>::MIN_UTC
                }),
        };

        let group_hint = cols
            .group
            .and_then(|col| row.text(col))
            .or_else(|| label.as_deref().and_then(group_from_label));

        Some(RawReading {
            voltage_in: row.number(cols.voltage_in),
            voltage_out: row.number(cols.voltage_out),
            current: row.number(cols.current),
            power: row.number(cols.power),
            pwm: row.number(cols.pwm),
            temperature: row.number(cols.temperature),
            status_bits: row.hex(cols.status),
            rssi: row.number(cols.rssi),
            device_key,
            label,
            mac,
            group_hint,
            age,
            captured_at,
        })
    }
}

impl PayloadGrammar for MeshTableGrammar {
    fn name(&self) -> &str {
        "mesh-table/v1"
    }

    fn parse(&self, payload: &RawPayload) -> Result<ParseReport, Error> {
        let table = html::find_table(&payload.body, TABLE_CLASS).ok_or_else(|| Error::Parse {
            grammar: self.name().into(),
            message: format!("no <table class=\"{TABLE_CLASS}\"> in {}", payload.source_path),
        })?;

        let report = self.parse_table(&table, payload);
        debug!(
            readings = report.readings.len(),
            skipped = report.skipped_records,
            field_errors = report.field_errors,
            "parsed status table"
        );
        Ok(report)
    }
}

/// One table row plus its soft-error tally.
struct Row<'a> {
    cells: &'a [String],
    field_errors: u32,
}

impl Row<'_> {
    /// Cell text at a 1-based column; blank and `n/a` cells are absent.
    fn text(&self, col: usize) -> Option<String> {
        let cell = self.cells.get(col.checked_sub(1)?)?.trim();
        if cell.is_empty() || cell.eq_ignore_ascii_case("n/a") {
            None
        } else {
            Some(cell.to_owned())
        }
    }

    fn number<T: FromStr>(&mut self, col: usize) -> Option<T> {
        let raw = self.text(col)?;
        let token = raw.split_whitespace().next().unwrap_or_default();
        let parsed = token.parse().ok();
        if parsed.is_none() {
            self.field_errors += 1;
        }
        parsed
    }

    fn hex(&mut self, col: usize) -> Option<u32> {
        let raw = self.text(col)?;
        let digits = raw.trim_start_matches("0x").trim_start_matches("0X");
        let parsed = u32::from_str_radix(digits, 16).ok();
        if parsed.is_none() {
            self.field_errors += 1;
        }
        parsed
    }
}

/// Parse the gateway's record age, e.g. `"12 sec"`, `"3 min"`, `"2 hrs"`.
pub(crate) fn parse_age(raw: &str) -> Option<Duration> {
    let mut parts = raw.split_whitespace();
    let value: u64 = parts.next()?.parse().ok()?;
    let unit = parts.next().unwrap_or("sec").to_ascii_lowercase();
    let secs = match unit.trim_end_matches('.') {
        "s" | "sec" | "secs" | "second" | "seconds" => value,
        "m" | "min" | "mins" | "minute" | "minutes" => value.checked_mul(60)?,
        "h" | "hr" | "hrs" | "hour" | "hours" => value.checked_mul(3_600)?,
        "d" | "day" | "days" => value.checked_mul(86_400)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

/// Tigo labels encode string and position (`A12` is panel 12 on string A).
pub fn group_from_label(label: &str) -> Option<String> {
    if !label.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let prefix: String = label.chars().take_while(|c| !c.is_ascii_digit()).collect();
    let prefix = prefix.trim().trim_end_matches(['-', '_', '.']).trim();
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_owned())
    }
}
