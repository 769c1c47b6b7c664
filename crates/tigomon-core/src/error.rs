// ── Core error types ──
//
// Errors surfaced by tigomon-core. Consumers see connection, auth, and
// data failures in domain terms; the `From<tigomon_api::Error>` impl
// folds the transport taxonomy into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to gateway at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Gateway did not respond within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Authentication errors ────────────────────────────────────────
    /// Credentials rejected, or a fresh session was refused again.
    /// Needs new configuration; retrying will not help.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// A status read was refused; the session must be re-acquired.
    #[error("Gateway session rejected (HTTP {status})")]
    SessionRejected { status: u16 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Unexpected response from {path}: {message}")]
    BadResponse { path: String, message: String },

    #[error("Unrecognized status payload ({grammar}): {message}")]
    Parse { grammar: String, message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// `true` for errors that need reconfiguration rather than a retry.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// `true` when the gateway could not be reached at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tigomon_api::Error> for CoreError {
    fn from(err: tigomon_api::Error) -> Self {
        let transient = err.is_transient();
        match err {
            tigomon_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            tigomon_api::Error::Unauthorized { status } => CoreError::SessionRejected { status },
            tigomon_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            tigomon_api::Error::ConnectionRefused { url, reason } => {
                CoreError::ConnectionFailed { url, reason }
            }
            tigomon_api::Error::Transport(ref e) if transient => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            // Reached the gateway but the exchange itself failed (body, decode)
            tigomon_api::Error::Transport(e) => CoreError::BadResponse {
                path: e
                    .url()
                    .map_or_else(|| "<unknown>".into(), |u| u.path().to_owned()),
                message: e.to_string(),
            },
            tigomon_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid gateway URL: {e}"),
            },
            tigomon_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            tigomon_api::Error::MalformedResponse { path, message } => {
                CoreError::BadResponse { path, message }
            }
            tigomon_api::Error::Parse { grammar, message } => CoreError::Parse { grammar, message },
        }
    }
}
