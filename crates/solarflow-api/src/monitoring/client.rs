// Monitoring API HTTP client
//
// Wraps `HttpFetcher` with URL construction, API key injection and JSON
// decoding. Endpoint methods live in `sites.rs` as inherent methods to
// keep this module focused on transport mechanics.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::fetch::{DEFAULT_MAX_RETRIES, FetchOptions, HttpFetcher, Method};
use crate::transport::TransportConfig;

/// Public endpoint of the monitoring API.
pub const DEFAULT_BASE_URL: &str = "https://monitoringapi.solaredge.com";

/// Per-endpoint timeout used by the site data endpoints.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one monitoring API account.
///
/// Every request carries the account's API key as the `api_key` query
/// parameter. The key never shows up in logs: only URL paths are logged.
#[derive(Clone)]
pub struct MonitoringClient {
    fetcher: HttpFetcher,
    base_url: Url,
    api_key: SecretString,
    request_timeout: Duration,
    request_retries: u32,
}

impl std::fmt::Debug for MonitoringClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringClient")
            .field("base_url", &self.base_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("request_retries", &self.request_retries)
            .finish_non_exhaustive()
    }
}

impl MonitoringClient {
    /// Create a client with a fresh HTTP connection pool.
    pub fn new(
        base_url: Url,
        api_key: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let fetcher = HttpFetcher::from_transport(transport)?;
        Ok(Self::with_fetcher(fetcher, base_url, api_key))
    }

    /// Create a client around an existing fetcher.
    ///
    /// Use this to share one connection pool between accounts.
    pub fn with_fetcher(fetcher: HttpFetcher, base_url: Url, api_key: SecretString) -> Self {
        Self {
            fetcher,
            base_url,
            api_key,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            request_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the timeout and attempt budget of the site data endpoints.
    pub fn with_request_policy(mut self, timeout: Duration, retries: u32) -> Self {
        self.request_timeout = timeout;
        self.request_retries = retries;
        self
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Timeout applied to each endpoint attempt.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Options used for the site data endpoints.
    pub(crate) fn endpoint_options(&self) -> FetchOptions {
        FetchOptions::new()
            .timeout(self.request_timeout)
            .max_retries(self.request_retries)
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{path}?{params}&api_key={key}`.
    pub(crate) fn api_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}"))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("api_key", self.api_key.expose_secret());
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Issue a GET and return the response once it has a success status.
    pub(crate) async fn get_raw(
        &self,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<reqwest::Response, Error> {
        debug!("GET {}", url.path());
        self.fetcher
            .fetch(Method::Get, url, options)
            .await
            .map_err(classify_auth)
    }

    /// Issue a GET and decode the JSON body. The body is read within the
    /// request timeout.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<T, Error> {
        debug!("GET {}", url.path());
        let body = self
            .fetcher
            .fetch_text(Method::Get, url, options)
            .await
            .map_err(classify_auth)?;

        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}

/// Surface a rejected API key as [`Error::Authorization`] once retries are spent.
fn classify_auth(err: Error) -> Error {
    match err.status() {
        Some(status @ (401 | 403)) => Error::Authorization {
            status,
            message: err.to_string(),
        },
        _ => err,
    }
}
