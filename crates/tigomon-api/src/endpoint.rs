// Gateway endpoint description
//
// Host, scheme, optional Basic credentials, and the fixed status page
// paths. Immutable for the lifetime of a session; supplied externally.

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Protocol scheme of the gateway's web server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain HTTP. The CCA ships without TLS.
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP Basic credentials for the gateway's legacy web server.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: SecretString,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Page paths on the gateway. Configuration-driven constants, never negotiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPaths {
    /// Per-optimizer production table.
    pub status: String,
    /// Gateway summary (unit id, firmware, hardware, board temperature).
    pub summary: String,
    /// Per-node firmware and hardware revisions.
    pub node_versions: String,
    /// Per-node MAC / label mapping.
    pub node_identities: String,
}

impl Default for StatusPaths {
    fn default() -> Self {
        Self {
            status: "/cgi-bin/meshdatapower".into(),
            summary: "/cgi-bin/lmudui".into(),
            node_versions: "/cgi-bin/meshnodever".into(),
            node_identities: "/cgi-bin/meshnodeinfo".into(),
        }
    }
}

/// Where and how to reach one gateway.
#[derive(Debug, Clone)]
pub struct GatewayEndpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: Option<u16>,
    /// `None` for unauthenticated gateways.
    pub credentials: Option<BasicCredentials>,
    pub paths: StatusPaths,
}

impl GatewayEndpoint {
    /// Endpoint for `host` with default scheme, port, and paths.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::default(),
            host: host.into(),
            port: None,
            credentials: None,
            paths: StatusPaths::default(),
        }
    }

    pub fn with_credentials(mut self, credentials: BasicCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Root URL of the gateway web server, e.g. `http://192.168.1.125/`.
    pub fn base_url(&self) -> Result<Url, Error> {
        let host = self.host.trim().trim_end_matches('/');
        let full = match self.port {
            Some(port) => format!("{}://{host}:{port}/", self.scheme),
            None => format!("{}://{host}/", self.scheme),
        };
        let url = Url::parse(&full)?;
        if url.host_str().is_none_or(str::is_empty) {
            return Err(Error::InvalidUrl(url::ParseError::EmptyHost));
        }
        Ok(url)
    }

    /// Resolve a page path against the base URL.
    pub fn page_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url()?.join(path)?)
    }
}
