// Shared transport configuration for building reqwest::Client instances.
//
// The fetcher and every monitoring client share connect timeout and
// user agent settings through this module.

use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("solarflow/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on TCP/TLS connection establishment.
    pub connect_timeout: Duration,
    /// Client-wide request timeout. Per-call timeouts are handled by
    /// [`HttpFetcher`](crate::HttpFetcher), so this is usually `None`.
    pub timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timeout: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(USER_AGENT);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder
            .build()
            .map_err(|e| Error::ClientSetup(format!("failed to build HTTP client: {e}")))
    }
}
