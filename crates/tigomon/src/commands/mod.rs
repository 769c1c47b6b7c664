pub mod config_cmd;
pub mod gateway;
pub mod inventory;
pub mod status;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Dispatch a gateway command to its handler.
pub async fn dispatch(
    cmd: Command,
    resolved: Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(&resolved, &args, global).await,
        Command::Watch(args) => watch::handle(resolved, args, global).await,
        Command::Gateway => gateway::handle(&resolved, global).await,
        Command::Inventory => inventory::handle(&resolved, global).await,
        Command::Config(_) | Command::Completions(_) => unreachable!("handled in main"),
    }
}
