use thiserror::Error;

/// Top-level error type for the `tigomon-api` crate.
///
/// Covers every failure mode of talking to a gateway: session
/// acquisition, transport, status reads, and payload parsing.
/// `tigomon-core` maps these into scheduler outcomes.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials were rejected (or are missing) during session acquisition.
    /// Not retryable without new configuration.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A status read was refused with an authorization failure.
    /// The caller must discard the session and acquire a new one.
    #[error("Unauthorized -- session rejected by gateway (HTTP {status})")]
    Unauthorized { status: u16 },

    // ── Transport ───────────────────────────────────────────────────
    /// The gateway did not answer within the configured timeout.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TCP connect failed (host down, port closed, DNS failure).
    #[error("Connection refused by {url}: {reason}")]
    ConnectionRefused { url: String, reason: String },

    /// Any other HTTP transport failure.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL construction failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup failed while building the HTTP client.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Non-2xx status or empty body on a status page.
    #[error("Malformed response from {path}: {message}")]
    MalformedResponse { path: String, message: String },

    /// The payload does not contain the expected envelope at all.
    #[error("Unrecognized payload ({grammar}): {message}")]
    Parse { grammar: String, message: String },
}

impl Error {
    /// Returns `true` if the session should be discarded and re-acquired.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns `true` if this is a transient error worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } | Self::ConnectionRefused { .. } => true,
            _ => false,
        }
    }

    /// Translate a `reqwest` failure into the fetch error taxonomy.
    pub(crate) fn from_request(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_secs }
        } else if err.is_connect() {
            Self::ConnectionRefused {
                url: err
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                reason: err.to_string(),
            }
        } else {
            Self::Transport(err)
        }
    }
}
