//! Gateway command: identity and health of the CCA itself.

use tigomon_api::{GatewayInfo, Session, parse_gateway_summary};

use crate::cli::GlobalOpts;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

fn detail(info: &GatewayInfo, host: &str) -> String {
    [
        format!("Host:         {host}"),
        format!("Unit ID:      {}", info.unit_id.as_deref().unwrap_or("-")),
        format!("Firmware:     {}", info.firmware.as_deref().unwrap_or("-")),
        format!("Hardware:     {}", info.hardware.as_deref().unwrap_or("-")),
        format!(
            "Temperature:  {}",
            info.temperature.map_or_else(|| "-".into(), |t| format!("{t:.1} °C"))
        ),
    ]
    .join("\n")
}

pub async fn handle(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let config = &resolved.gateway;
    let session = Session::acquire(&config.endpoint, &config.transport())
        .await
        .map_err(|e| CliError::from(e).for_profile(&resolved.profile_name))?;

    let payload = session.fetch_summary().await;
    session.close();
    let payload = payload?;
    let info = parse_gateway_summary(&payload)?;

    let out = output::render_single(
        &global.output,
        &info,
        |i| detail(i, &config.endpoint.host),
        |i| i.unit_id.clone().unwrap_or_default(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
