// Gateway summary page (`lmudui`)
//
// Label/value pairs laid out as adjacent text nodes rather than a table.

use serde::{Deserialize, Serialize};

use super::html;
use crate::error::Error;
use crate::fetch::RawPayload;

/// Identity and health of the gateway itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub unit_id: Option<String>,
    pub firmware: Option<String>,
    pub hardware: Option<String>,
    /// Gateway board temperature in °C.
    pub temperature: Option<f64>,
}

impl GatewayInfo {
    pub fn is_empty(&self) -> bool {
        self.unit_id.is_none()
            && self.firmware.is_none()
            && self.hardware.is_none()
            && self.temperature.is_none()
    }
}

/// Parse the summary page. Fails only when none of the known labels appear.
pub fn parse_gateway_summary(payload: &RawPayload) -> Result<GatewayInfo, Error> {
    let nodes = html::text_nodes(&payload.body);
    let mut info = GatewayInfo::default();
    let mut iter = nodes.iter().peekable();

    while let Some(node) = iter.next() {
        if node == "CC Temperature" {
            info.temperature = iter
                .next()
                .and_then(|v| v.trim_end_matches('C').trim().parse().ok());
        } else if let Some((_, rest)) = node.split_once("Unit id") {
            info.unit_id = rest
                .trim_start_matches([':', ' '])
                .split_whitespace()
                .next()
                .map(str::to_owned);
        } else if node.contains("Firmware Version") {
            // The first value cell is sometimes a `0.0` placeholder.
            while iter.next_if(|v| v.as_str() == "0.0").is_some() {}
            info.firmware = iter.next().cloned();
        } else if node.contains("Hardware Platform") {
            info.hardware = iter.next().cloned();
        }
    }

    if info.is_empty() {
        return Err(Error::Parse {
            grammar: "summary/v1".into(),
            message: format!("no gateway fields in {}", payload.source_path),
        });
    }
    Ok(info)
}
