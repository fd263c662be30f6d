// Retrying HTTP fetcher
//
// Every monitoring API call goes through `HttpFetcher::fetch`. A call is
// one or more attempts; each failed transient attempt (transport error,
// timeout or non-success status) is followed by an exponential delay
// computed from the attempt index alone.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Delay after the first failed attempt; doubles for each following one.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(500);

/// Total attempts used when the caller does not say otherwise.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// HTTP methods supported by the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Per-call options for [`HttpFetcher::fetch`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Abort an attempt that has not completed in time, body included.
    pub timeout: Option<Duration>,
    /// Total attempts, including the first. Zero behaves like one.
    pub max_retries: u32,
    /// JSON body, sent with [`Method::Post`] only.
    pub body: Option<Value>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            max_retries: DEFAULT_MAX_RETRIES,
            body: None,
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

/// Backoff before retrying after failed attempt number `attempt` (1-based):
/// `base * 2^(attempt - 1)`.
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor)
}

/// A retrying, timeout-capable wrapper around `reqwest::Client`.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
    retry_base: Duration,
}

impl HttpFetcher {
    /// Wrap an existing `reqwest::Client`.
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            retry_base: DEFAULT_RETRY_BASE,
        }
    }

    /// Build a fetcher with a fresh client from a [`TransportConfig`].
    pub fn from_transport(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self::new(transport.build_client()?))
    }

    /// Override the base retry delay (defaults to 500ms).
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    /// Perform the request, retrying per `options.max_retries`.
    ///
    /// Returns the raw response of the first successful attempt; decoding
    /// is left to the caller. The per-call timeout stays attached to the
    /// response, so reading its body later is bounded as well. After the
    /// retry budget is spent, returns [`Error::RetriesExhausted`] wrapping
    /// the last failure.
    pub async fn fetch(
        &self,
        method: Method,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<reqwest::Response, Error> {
        self.retrying(url, options, move || {
            bounded(options.timeout, self.send_checked(method, url, options))
        })
        .await
    }

    /// Like [`fetch`](Self::fetch), but reads the body inside each attempt.
    ///
    /// A body that stalls past the timeout fails the attempt and is retried
    /// like any other transient failure.
    pub async fn fetch_text(
        &self,
        method: Method,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<String, Error> {
        self.retrying(url, options, move || {
            bounded(options.timeout, async move {
                let resp = self.send_checked(method, url, options).await?;
                Ok(resp.text().await?)
            })
        })
        .await
    }

    async fn retrying<T, F, Fut>(
        &self,
        url: &Url,
        options: &FetchOptions,
        mut op: F,
    ) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let max_attempts = options.attempts();
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt < max_attempts => {
                    let delay = retry_delay(self.retry_base, attempt);
                    debug!(
                        path = url.path(),
                        attempt,
                        max_attempts,
                        delay_ms = millis(delay),
                        error = %err,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(Error::RetriesExhausted {
                        attempts: attempt,
                        status: err.status(),
                        last: Box::new(err),
                    });
                }
            }
        }
    }

    async fn send_checked(
        &self,
        method: Method,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<reqwest::Response, Error> {
        // The query string carries the API key; only the path is logged.
        trace!(?method, path = url.path(), "sending request");

        let mut builder = match method {
            Method::Get => self.http.get(url.clone()),
            Method::Post => {
                let builder = self.http.post(url.clone());
                match &options.body {
                    Some(body) => builder.json(body),
                    None => builder,
                }
            }
        };
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(resp)
    }
}

/// Run one attempt under the per-call timeout, if any.
async fn bounded<T>(
    timeout: Option<Duration>,
    attempt: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: millis(timeout),
            })?,
        None => attempt.await,
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
