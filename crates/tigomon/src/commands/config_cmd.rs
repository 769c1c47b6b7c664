//! Config subcommand handlers.

use tabled::Tabled;

use tigomon_config::{Config, config_path, load_config, store_password, to_toml};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Default")]
    default: String,
}

#[derive(serde::Serialize)]
struct ProfileEntry {
    name: String,
    host: String,
    username: Option<String>,
    default: bool,
}

/// Copy of the config with plaintext passwords masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some("****".into());
        }
    }
    cfg
}

fn profile_entries(cfg: &Config) -> Vec<ProfileEntry> {
    let default = cfg.profile_name(None);
    let mut entries: Vec<_> = cfg
        .profiles
        .iter()
        .map(|(name, p)| ProfileEntry {
            name: name.clone(),
            host: p.host.clone(),
            username: p.username.clone(),
            default: name == default,
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redacted(&load_config()?);
            let text = to_toml(&cfg)?;
            let out =
                output::render_single(&global.output, &cfg, |_| text.clone(), |_| text.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = load_config()?;
            let entries = profile_entries(&cfg);
            let out = output::render_list(
                &global.output,
                &entries,
                |e| ProfileRow {
                    name: e.name.clone(),
                    host: e.host.clone(),
                    username: e.username.clone().unwrap_or_else(|| "-".into()),
                    default: if e.default { "*".into() } else { String::new() },
                },
                |e| e.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = load_config()?;
            let name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));

            let password = rpassword::prompt_password(format!("Password for '{name}': "))?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "cannot be empty".into(),
                });
            }
            store_password(&name, &password)?;
            if !global.quiet {
                eprintln!("Password for '{name}' stored in system keyring");
            }
            Ok(())
        }
    }
}
