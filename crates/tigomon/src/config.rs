//! CLI configuration: thin wrapper around `tigomon_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--host, --username, --timeout).

use tigomon_config::{Config, ConfigError, Profile};
use tigomon_core::GatewayConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// A gateway configuration plus the profile it came from.
pub struct Resolved {
    pub profile_name: String,
    pub gateway: GatewayConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_owned()
}

/// Build a `GatewayConfig` from the config file, profile, and CLI overrides.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = tigomon_config::load_config()?;
    resolve_with(global, &cfg)
}

fn resolve_with(global: &GlobalOpts, cfg: &Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let profile = match cfg.profile(&profile_name) {
        Ok(profile) => apply_overrides(profile.clone(), global),
        // No profile: build one from flags / env alone
        Err(_) if global.host.is_some() && global.profile.is_none() => {
            apply_overrides(Profile::default(), global)
        }
        Err(ConfigError::UnknownProfile { profile, path }) if global.profile.is_some() => {
            let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
            names.sort();
            return Err(CliError::ProfileNotFound {
                name: profile,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
                path: path.display().to_string(),
            });
        }
        Err(_) => {
            return Err(CliError::NoConfig {
                path: tigomon_config::config_path().display().to_string(),
            });
        }
    };

    let gateway = tigomon_config::profile_to_gateway_config(&profile, &profile_name, &cfg.defaults)?;
    Ok(Resolved {
        profile_name,
        gateway,
    })
}

/// CLI flags take priority over profile values.
fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}
