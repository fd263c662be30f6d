use thiserror::Error;

/// Top-level error type for the `solarflow-api` crate.
///
/// Covers every failure mode of a monitoring API call: transport, HTTP
/// status, authorization and decoding. `solarflow-core` maps these into
/// domain-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authorization ───────────────────────────────────────────────
    /// The API key was rejected (HTTP 401 / 403).
    #[error("Authorization failed (HTTP {status}): {message}")]
    Authorization { status: u16, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The in-flight request was aborted after exceeding its timeout.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    // ── HTTP ────────────────────────────────────────────────────────
    /// Non-success HTTP status, with a preview of the response body.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Every attempt allowed by the retry budget failed.
    #[error("Request failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        attempts: u32,
        /// HTTP status of the last failed attempt, if it got that far.
        status: Option<u16>,
        #[source]
        last: Box<Error>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// The HTTP status code behind this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authorization { status, .. } | Self::HttpStatus { status, .. } => Some(*status),
            Self::RetriesExhausted { status, last, .. } => status.or_else(|| last.status()),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the request was aborted by a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_timeout(),
            Self::RetriesExhausted { last, .. } => last.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if the API rejected the credential.
    pub fn is_auth_rejected(&self) -> bool {
        match self {
            Self::Authorization { .. } => true,
            Self::RetriesExhausted { last, .. } => last.is_auth_rejected(),
            _ => matches!(self.status(), Some(401 | 403)),
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            Self::Timeout { .. } | Self::HttpStatus { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_looks_through_retries() {
        let err = Error::RetriesExhausted {
            attempts: 3,
            status: None,
            last: Box::new(Error::HttpStatus {
                status: 502,
                body: String::new(),
            }),
        };
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn timeout_is_detected_through_retries() {
        let err = Error::RetriesExhausted {
            attempts: 2,
            status: None,
            last: Box::new(Error::Timeout { timeout_ms: 30_000 }),
        };
        assert!(err.is_timeout());
        assert!(!err.is_auth_rejected());
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(Error::Timeout { timeout_ms: 200 }.is_transient());
        assert!(
            Error::HttpStatus {
                status: 503,
                body: String::new(),
            }
            .is_transient()
        );
        assert!(
            !Error::Deserialization {
                message: "expected value".into(),
                body: String::new(),
            }
            .is_transient()
        );
        assert!(!Error::ClientSetup("no tls backend".into()).is_transient());
    }

    #[test]
    fn forbidden_status_counts_as_auth_rejection() {
        let err = Error::RetriesExhausted {
            attempts: 1,
            status: Some(403),
            last: Box::new(Error::HttpStatus {
                status: 403,
                body: "Invalid token".into(),
            }),
        };
        assert!(err.is_auth_rejected());
    }
}
