// ── Gateway source seam ──
//
// The poll loop talks to the gateway only through `GatewaySource`, so the
// session is an owned value passed into every read. `HttpGateway` is the
// real implementation; tests drive the loop with scripted sources.

use std::future::Future;

use tigomon_api::{GatewayEndpoint, InventoryPages, RawPayload, Session, TransportConfig};

use crate::config::GatewayConfig;

/// Where a poll loop gets its raw pages from.
pub trait GatewaySource: Send + Sync + 'static {
    /// Authenticated connection context, owned by exactly one loop.
    type Session: Send + Sync + 'static;

    /// Perform the login handshake.
    fn acquire(&self) -> impl Future<Output = Result<Self::Session, tigomon_api::Error>> + Send;

    fn fetch_status(
        &self,
        session: &Self::Session,
    ) -> impl Future<Output = Result<RawPayload, tigomon_api::Error>> + Send;

    fn fetch_summary(
        &self,
        session: &Self::Session,
    ) -> impl Future<Output = Result<RawPayload, tigomon_api::Error>> + Send;

    fn fetch_inventory(
        &self,
        session: &Self::Session,
    ) -> impl Future<Output = Result<InventoryPages, tigomon_api::Error>> + Send;

    /// Give the session back. Called on re-acquisition and shutdown.
    fn release(&self, session: Self::Session);
}

/// [`GatewaySource`] over HTTP, backed by [`tigomon_api::Session`].
#[derive(Debug, Clone)]
pub struct HttpGateway {
    endpoint: GatewayEndpoint,
    transport: TransportConfig,
}

impl HttpGateway {
    pub fn new(endpoint: GatewayEndpoint, transport: TransportConfig) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.endpoint.clone(), config.transport())
    }

    pub fn endpoint(&self) -> &GatewayEndpoint {
        &self.endpoint
    }
}

impl GatewaySource for HttpGateway {
    type Session = Session;

    async fn acquire(&self) -> Result<Session, tigomon_api::Error> {
        Session::acquire(&self.endpoint, &self.transport).await
    }

    async fn fetch_status(&self, session: &Session) -> Result<RawPayload, tigomon_api::Error> {
        session.fetch_status().await
    }

    async fn fetch_summary(&self, session: &Session) -> Result<RawPayload, tigomon_api::Error> {
        session.fetch_summary().await
    }

    async fn fetch_inventory(
        &self,
        session: &Session,
    ) -> Result<InventoryPages, tigomon_api::Error> {
        session.fetch_inventory_pages().await
    }

    fn release(&self, session: Session) {
        session.close();
    }
}
