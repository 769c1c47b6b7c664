// ── API-to-domain type conversions ──
//
// Bridges the parser's intermediate records into `tigomon_core::model`
// types. Numeric fields pass through untouched: absent stays absent.

use tigomon_api::{NodeInfo, RawReading};

use crate::model::{NodeDetails, PanelReading};

impl From<&RawReading> for PanelReading {
    fn from(raw: &RawReading) -> Self {
        Self {
            voltage_in: raw.voltage_in,
            voltage_out: raw.voltage_out,
            current: raw.current,
            power: raw.power,
            pwm: raw.pwm,
            temperature: raw.temperature,
            status_bits: raw.status_bits,
            rssi: raw.rssi,
            captured_at: raw.captured_at,
        }
    }
}

impl From<&NodeInfo> for NodeDetails {
    fn from(node: &NodeInfo) -> Self {
        Self {
            firmware: node.firmware.clone(),
            hardware: node.hardware.clone(),
            model: node.model().to_owned(),
        }
    }
}
