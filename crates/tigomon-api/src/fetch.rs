// Raw status reads
//
// One request per page, bounded by the transport timeout. No retries here;
// the poll scheduler owns retry policy.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use tracing::{debug, trace};

use crate::error::Error;
use crate::session::Session;

/// Body of one gateway page, as fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    pub body: String,
    pub fetched_at: DateTime<Utc>,
    pub source_path: String,
}

impl RawPayload {
    pub fn new(
        body: impl Into<String>,
        fetched_at: DateTime<Utc>,
        source_path: impl Into<String>,
    ) -> Self {
        Self {
            body: body.into(),
            fetched_at,
            source_path: source_path.into(),
        }
    }
}

/// The two pages that together describe the optimizer inventory.
#[derive(Debug, Clone)]
pub struct InventoryPages {
    pub versions: RawPayload,
    pub identities: RawPayload,
}

impl Session {
    /// Fetch the per-optimizer status table.
    pub async fn fetch_status(&self) -> Result<RawPayload, Error> {
        let path = self.endpoint().paths.status.clone();
        self.get_page(&path).await
    }

    /// Fetch the gateway summary page.
    pub async fn fetch_summary(&self) -> Result<RawPayload, Error> {
        let path = self.endpoint().paths.summary.clone();
        self.get_page(&path).await
    }

    /// Fetch the node version and node identity pages.
    pub async fn fetch_inventory_pages(&self) -> Result<InventoryPages, Error> {
        let paths = self.endpoint().paths.clone();
        let versions = self.get_page(&paths.node_versions).await?;
        let identities = self.get_page(&paths.node_identities).await?;
        Ok(InventoryPages {
            versions,
            identities,
        })
    }

    /// GET a page and classify the response.
    pub(crate) async fn get_page(&self, path: &str) -> Result<RawPayload, Error> {
        let url = self.url_for(path)?;
        debug!("GET {}", url);

        let resp = self
            .get(url)
            .send()
            .await
            .map_err(|e| Error::from_request(e, self.timeout_secs()))?;

        let status = resp.status();
        trace!(%status, path, "gateway response");

        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || status.is_redirection()
        {
            return Err(Error::Unauthorized {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::MalformedResponse {
                path: path.to_owned(),
                message: format!("HTTP {status}: {}", preview(&body)),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_request(e, self.timeout_secs()))?;

        if body.trim().is_empty() {
            return Err(Error::MalformedResponse {
                path: path.to_owned(),
                message: "empty body".into(),
            });
        }

        Ok(RawPayload {
            body,
            fetched_at: Utc::now(),
            source_path: path.to_owned(),
        })
    }
}

fn preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}
