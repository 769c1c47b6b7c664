// tigomon-api: async client for the local status pages of Tigo CCA gateways

pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod parse;
pub mod session;
pub mod transport;

pub use endpoint::{BasicCredentials, GatewayEndpoint, Scheme, StatusPaths};
pub use error::Error;
pub use fetch::{InventoryPages, RawPayload};
pub use parse::{
    ColumnMap, GatewayInfo, MeshTableGrammar, NodeInfo, ParseReport, PayloadGrammar, RawReading,
    group_from_label, parse_gateway_summary, parse_node_inventory,
};
pub use session::Session;
pub use transport::{TlsMode, TransportConfig};
