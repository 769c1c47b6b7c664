//! Inventory command: optimizer firmware, hardware, and models.

use tabled::Tabled;

use tigomon_api::{NodeInfo, Session, group_from_label, parse_node_inventory};

use crate::cli::GlobalOpts;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Panel")]
    label: String,
    #[tabled(rename = "String")]
    group: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
    #[tabled(rename = "Hardware")]
    hardware: String,
}

impl From<&NodeInfo> for NodeRow {
    fn from(n: &NodeInfo) -> Self {
        Self {
            label: n.label.clone(),
            group: group_from_label(&n.label).unwrap_or_else(|| "-".into()),
            mac: n.mac.clone().unwrap_or_else(|| "-".into()),
            model: n.model().into(),
            firmware: n.firmware.clone().unwrap_or_else(|| "-".into()),
            hardware: n.hardware.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

pub async fn handle(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let config = &resolved.gateway;
    let session = Session::acquire(&config.endpoint, &config.transport())
        .await
        .map_err(|e| CliError::from(e).for_profile(&resolved.profile_name))?;

    let pages = session.fetch_inventory_pages().await;
    session.close();
    let pages = pages?;
    let nodes = parse_node_inventory(&pages.versions, &pages.identities)?;

    let out = output::render_list(
        &global.output,
        &nodes,
        |n| NodeRow::from(n),
        |n| n.label.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
