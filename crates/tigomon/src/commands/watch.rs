//! Watch command: continuous polling until Ctrl-C.

use std::sync::Arc;

use tracing::{debug, warn};

use tigomon_api::MeshTableGrammar;
use tigomon_core::{Availability, HttpGateway, Poller, Snapshot};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

use super::status;

pub async fn handle(
    resolved: Resolved,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut config = resolved.gateway;
    if let Some(interval) = args.interval {
        config.poll_interval = interval;
        config.max_backoff = config.max_backoff.max(interval);
    }

    let source = HttpGateway::from_config(&config);
    let grammar = Arc::new(MeshTableGrammar::default());
    let poller = Poller::start(&config, source, grammar)
        .await
        .map_err(|e| CliError::from(e).for_profile(&resolved.profile_name))?;

    let color = output::should_color(&global.color);
    let mut stream = poller.subscribe();
    let mut availability = poller.subscribe_availability();
    let mut printed = 0u32;

    let print = |snap: &Arc<Snapshot>, printed: &mut u32| {
        let out = status::render_snapshot(snap, args.group.as_deref(), global, color);
        output::print_output(&out, global.quiet);
        *printed += 1;
    };

    // The first cycle may have published before we subscribed
    if stream.current().captured_at.is_some() {
        print(stream.current(), &mut printed);
    }

    while args.count.is_none_or(|n| printed < n) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
            changed = stream.changed() => {
                let Some(snap) = changed else { break };
                print(&snap, &mut printed);
            }
            Ok(()) = availability.changed() => {
                let current = availability.borrow_and_update().clone();
                match current {
                    Availability::Available => debug!("gateway available"),
                    Availability::Degraded { reason } => warn!(%reason, "gateway degraded"),
                    Availability::Unavailable { reason } => {
                        eprintln!("gateway unavailable: {reason}");
                    }
                }
            }
        }
    }

    poller.shutdown().await;
    Ok(())
}
