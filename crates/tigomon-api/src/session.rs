// Gateway session
//
// An authenticated connection context: one `reqwest::Client` with its own
// cookie jar plus the Basic credentials attached to every request. The CCA
// has no login endpoint; the handshake is a probe read of the status page.

use secrecy::ExposeSecret;
use tracing::debug;
use url::Url;

use crate::endpoint::GatewayEndpoint;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Reusable, authenticated connection to one gateway.
///
/// Owned by exactly one poll loop. Dropping it releases the underlying
/// connection pool; [`close`](Self::close) does the same with a log line.
pub struct Session {
    http: reqwest::Client,
    endpoint: GatewayEndpoint,
    base_url: Url,
    timeout_secs: u64,
}

impl Session {
    /// Perform the login handshake and return a reusable session.
    ///
    /// Credentials are optional. A rejected probe (401/403, or a redirect to
    /// the login page) is reported as [`Error::Authentication`], which is not
    /// retryable without new configuration.
    pub async fn acquire(
        endpoint: &GatewayEndpoint,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        let session = Self::with_client(http, endpoint.clone(), config.timeout_secs())?;

        debug!(url = %session.base_url, "acquiring gateway session");

        match session.get_page(&endpoint.paths.status).await {
            Ok(_) => {
                debug!("gateway session established");
                Ok(session)
            }
            Err(Error::Unauthorized { status }) => Err(Error::Authentication {
                message: if endpoint.credentials.is_some() {
                    format!("credentials rejected (HTTP {status})")
                } else {
                    format!("gateway requires credentials (HTTP {status})")
                },
            }),
            Err(e) => Err(e),
        }
    }

    /// Wrap a pre-built client without performing the handshake.
    ///
    /// Used by tests and by callers that manage their own client.
    pub fn with_client(
        http: reqwest::Client,
        endpoint: GatewayEndpoint,
        timeout_secs: u64,
    ) -> Result<Self, Error> {
        let base_url = endpoint.base_url()?;
        Ok(Self {
            http,
            endpoint,
            base_url,
            timeout_secs,
        })
    }

    /// The endpoint this session talks to.
    pub fn endpoint(&self) -> &GatewayEndpoint {
        &self.endpoint
    }

    /// The gateway base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Release the session and its connections.
    pub fn close(self) {
        debug!(url = %self.base_url, "releasing gateway session");
        drop(self);
    }

    pub(crate) fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub(crate) fn url_for(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// GET with Basic auth applied when credentials are configured.
    pub(crate) fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http.get(url);
        match &self.endpoint.credentials {
            Some(creds) => {
                builder.basic_auth(&creds.username, Some(creds.password.expose_secret()))
            }
            None => builder,
        }
    }
}
