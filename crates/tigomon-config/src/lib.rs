//! Shared configuration for the tigomon CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `tigomon_core::GatewayConfig`. The CLI layers its
//! own flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tigomon_api::{BasicCredentials, GatewayEndpoint, Scheme};
use tigomon_core::{GatewayConfig, TlsVerification};

const KEYRING_SERVICE: &str = "tigomon";
const PASSWORD_ENV: &str = "TIGOMON_PASSWORD";
const USERNAME_ENV: &str = "TIGOMON_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found in {}", .path.display())]
    UnknownProfile { profile: String, path: PathBuf },

    #[error("no password configured for user '{username}' in profile '{profile}'")]
    NoCredentials { profile: String, username: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named gateway profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: the explicit one, else `default_profile`.
    pub fn profile_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
                path: config_path(),
            })
    }
}

/// Values applied to every profile that doesn't override them.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between poll cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Missed cycles before a panel is reported stale.
    #[serde(default = "default_stale_after")]
    pub stale_after: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
            stale_after: default_stale_after(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    30
}
fn default_stale_after() -> u32 {
    3
}

/// A named gateway profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Gateway host name or IP address.
    pub host: String,

    #[serde(default)]
    pub scheme: Scheme,

    pub port: Option<u16>,

    /// Basic-auth user. Unset for gateways without authentication.
    pub username: Option<String>,

    /// Plaintext password (prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Path to a custom CA certificate (HTTPS only).
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification.
    pub insecure: Option<bool>,

    pub timeout: Option<u64>,
    pub poll_interval: Option<u64>,
    pub stale_after: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "tigomon", "tigomon").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("tigomon");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("TIGOMON_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Render a config as TOML.
pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve Basic credentials for a profile.
///
/// Returns `Ok(None)` when no username is configured anywhere: the gateway
/// is assumed to be unauthenticated.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Option<BasicCredentials>, ConfigError> {
    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok());
    let Some(username) = username else {
        return Ok(None);
    };

    let password = resolve_password_with(
        profile,
        |name| std::env::var(name).ok(),
        || keyring_password(profile_name),
    )
    .ok_or_else(|| ConfigError::NoCredentials {
        profile: profile_name.into(),
        username: username.clone(),
    })?;

    Ok(Some(BasicCredentials { username, password }))
}

/// Password chain: `password_env` → `TIGOMON_PASSWORD` → keyring → plaintext.
fn resolve_password_with(
    profile: &Profile,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl FnOnce() -> Option<String>,
) -> Option<SecretString> {
    if let Some(pw) = profile.password_env.as_deref().and_then(&env) {
        return Some(SecretString::from(pw));
    }
    if let Some(pw) = env(PASSWORD_ENV) {
        return Some(SecretString::from(pw));
    }
    if let Some(pw) = keyring() {
        return Some(SecretString::from(pw));
    }
    profile.password.clone().map(SecretString::from)
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring_entry(profile_name)
        .and_then(|entry| entry.get_password())
        .ok()
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `GatewayConfig` from a profile, no CLI flag overrides.
pub fn profile_to_gateway_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<GatewayConfig, ConfigError> {
    let credentials = resolve_credentials(profile, profile_name)?;
    build_gateway_config(profile, defaults, credentials)
}

fn build_gateway_config(
    profile: &Profile,
    defaults: &Defaults,
    credentials: Option<BasicCredentials>,
) -> Result<GatewayConfig, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: "must not be empty".into(),
        });
    }

    let mut endpoint = GatewayEndpoint::new(profile.host.trim()).with_scheme(profile.scheme);
    endpoint.port = profile.port;
    endpoint.credentials = credentials;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut cfg = GatewayConfig::new(endpoint);
    cfg.tls = tls;
    cfg.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    cfg.poll_interval =
        Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval));
    cfg.max_backoff = cfg.max_backoff.max(cfg.poll_interval);
    cfg.stale_after_misses = profile.stale_after.unwrap_or(defaults.stale_after);

    cfg.validate().map_err(|e| ConfigError::Validation {
        field: "profile".into(),
        reason: e.to_string(),
    })?;
    Ok(cfg)
}
