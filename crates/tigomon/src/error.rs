//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use tigomon_config::ConfigError;
use tigomon_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to gateway at {url}")]
    #[diagnostic(
        code(tigomon::connection_failed),
        help(
            "Check that the gateway is powered and reachable on the LAN.\n\
             URL: {url}\n\
             Try: tigomon gateway --host <ip>"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(tigomon::timeout),
        help("Increase timeout with --timeout; the CCA can be slow while it scans the mesh.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(tigomon::auth_failed),
        help(
            "Verify the gateway's username and password.\n\
             Run: tigomon config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No password configured for user '{username}' in profile '{profile}'")]
    #[diagnostic(
        code(tigomon::no_credentials),
        help(
            "Store one with: tigomon config set-password --profile {profile}\n\
             Or set the TIGOMON_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String, username: String },

    // ── Gateway data ─────────────────────────────────────────────────
    #[error("Unexpected response from gateway: {message}")]
    #[diagnostic(code(tigomon::bad_response))]
    BadResponse { message: String },

    #[error("Status page not recognized: {message}")]
    #[diagnostic(
        code(tigomon::unrecognized_payload),
        help("The gateway firmware may use a different page layout. Run with -vv for details.")
    )]
    UnrecognizedPayload { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tigomon::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(tigomon::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Add one to {path}"
        )
    )]
    ProfileNotFound {
        name: String,
        available: String,
        path: String,
    },

    #[error("No gateway configured")]
    #[diagnostic(
        code(tigomon::no_config),
        help(
            "Pass --host <ip>, set TIGOMON_HOST, or add a profile.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(tigomon::config))]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to auth failures for the help text.
    pub fn for_profile(self, name: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: name.into(),
                message,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },

            CoreError::SessionRejected { status } => CliError::AuthFailed {
                profile: "default".into(),
                message: format!("gateway refused the session (HTTP {status})"),
            },

            CoreError::BadResponse { path, message } => CliError::BadResponse {
                message: format!("{path}: {message}"),
            },

            CoreError::Parse { grammar, message } => CliError::UnrecognizedPayload {
                message: format!("{grammar}: {message}"),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },
        }
    }
}

impl From<tigomon_api::Error> for CliError {
    fn from(err: tigomon_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { profile, path } => CliError::ProfileNotFound {
                name: profile,
                available: "(none)".into(),
                path: path.display().to_string(),
            },
            ConfigError::NoCredentials { profile, username } => {
                CliError::NoCredentials { profile, username }
            }
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
