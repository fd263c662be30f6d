//! Async client for a SolarEdge-style solar monitoring API.
//!
//! - [`HttpFetcher`]: retrying, timeout-capable GET/POST with exponential
//!   backoff between attempts.
//! - [`MonitoringClient`]: typed account and site endpoints (authorization
//!   probe, site listing, inventory, current power flow) on top of the fetcher.
//! - [`models`]: wire types mirroring the provider's JSON.

pub mod error;
pub mod fetch;
pub mod monitoring;
pub mod transport;

pub use error::Error;
pub use fetch::{FetchOptions, HttpFetcher, Method, retry_delay};
pub use monitoring::client::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT, MonitoringClient};
pub use monitoring::models;
pub use transport::TransportConfig;
