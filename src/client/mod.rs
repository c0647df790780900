//! # Gateway Client
//!
//! Authenticated, rate-limited and circuit-protected access to the Apigee
//! management API.

pub mod gateway;
pub mod request;
pub mod transport;

pub use gateway::{
    truncate, GatewayClient, GatewayConfig, MAX_RESPONSE_DETAIL_LENGTH, MAX_RESPONSE_LOG_LENGTH,
};
pub use request::{build_headers, build_url, GatewayRequest};
pub use transport::{
    ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse,
};
