// Optimizer inventory (`meshnodever` + `meshnodeinfo`)
//
// The version page lists firmware/hardware per label; the identity page
// maps MAC to label. Merged by label.

use serde::{Deserialize, Serialize};

use super::html;
use crate::error::Error;
use crate::fetch::RawPayload;

const TABLE_CLASS: &str = "list_tb";

/// Static facts about one optimizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub label: String,
    pub mac: Option<String>,
    pub firmware: Option<String>,
    pub hardware: Option<String>,
}

impl NodeInfo {
    /// Optimizer model derived from the hardware revision string.
    pub fn model(&self) -> &'static str {
        let Some(hw) = self.hardware.as_deref() else {
            return "?";
        };
        let has = |codes: &[&str]| codes.iter().any(|c| hw.contains(c));
        if has(&["455"]) {
            "TS4-A-M"
        } else if has(&["461", "462"]) {
            "TS4-A-O"
        } else if has(&["466"]) {
            "TS4-A-S"
        } else if has(&["481", "486", "488"]) {
            "TS4-A-F"
        } else if has(&["484", "485", "487"]) {
            "TS4-A-2F"
        } else {
            "?"
        }
    }

    /// The key the status table would use for this node.
    pub fn device_key(&self) -> &str {
        self.mac.as_deref().unwrap_or(&self.label)
    }
}

/// Merge the node version and node identity pages into one inventory.
pub fn parse_node_inventory(
    versions: &RawPayload,
    identities: &RawPayload,
) -> Result<Vec<NodeInfo>, Error> {
    let version_table = require_table(versions)?;
    let identity_table = require_table(identities)?;

    let mut nodes: Vec<NodeInfo> = version_table
        .rows
        .iter()
        .filter_map(|cells| {
            let label = cell(cells, 2)?;
            Some(NodeInfo {
                label,
                mac: None,
                firmware: cell(cells, 7),
                hardware: cell(cells, 9),
            })
        })
        .collect();

    for cells in &identity_table.rows {
        let (Some(mac), Some(label)) = (cell(cells, 2), cell(cells, 3)) else {
            continue;
        };
        match nodes.iter_mut().find(|n| n.label == label) {
            Some(node) => node.mac = Some(mac),
            None => nodes.push(NodeInfo {
                label,
                mac: Some(mac),
                ..NodeInfo::default()
            }),
        }
    }

    Ok(nodes)
}

fn require_table(payload: &RawPayload) -> Result<html::HtmlTable, Error> {
    html::find_table(&payload.body, TABLE_CLASS).ok_or_else(|| Error::Parse {
        grammar: "inventory/v1".into(),
        message: format!("no <table class=\"{TABLE_CLASS}\"> in {}", payload.source_path),
    })
}

fn cell(cells: &[String], col: usize) -> Option<String> {
    let text = cells.get(col.checked_sub(1)?)?.trim();
    (!text.is_empty() && !text.eq_ignore_ascii_case("n/a")).then(|| text.to_owned())
}
