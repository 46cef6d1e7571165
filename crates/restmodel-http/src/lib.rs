//! Request, gateway and client layer for RestModel Rust.
//!
//! - `Request` / `Response` describe one exchange
//! - `Gateway` executes a request through a pluggable `Transport`
//! - `Client` stamps the base URI, runs requests and maps failure statuses
//! - `ClientRegistry` reuses clients with identical configuration
//!
//! The `http` feature (on by default) provides a reqwest-backed blocking
//! transport. `ScriptedTransport` replays canned responses for tests.

pub mod client;
pub mod config;
pub mod envelope;
pub mod gateway;
#[cfg(feature = "http")]
pub mod http;
pub mod registry;
pub mod request;
pub mod response;
pub mod status;
pub mod transport;

pub use client::{
    Client, DescribeEndpoint, ErrorBody, ErrorCode, SchemaSource, SharedClient, StaticSchemas,
    run_shared,
};
pub use config::ClientConfig;
pub use envelope::Envelope;
pub use gateway::Gateway;
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use registry::ClientRegistry;
pub use request::{Method, Request};
pub use response::Response;
pub use transport::{
    Body, FilePart, ScriptedTransport, Transport, TransportRequest, TransportResponse,
};
