// ── Core error types ──
//
// Domain errors from solarflow-core. Consumers never see raw HTTP or JSON
// failures; the `From<solarflow_api::Error>` impl folds them into the
// variants below.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Authorization rejected: {message}")]
    AuthorizationFailed { message: String },

    #[error("Cannot reach monitoring API at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` when the credential was rejected and the connection
    /// must go back through authorization.
    pub fn is_auth_rejected(&self) -> bool {
        match self {
            Self::AuthorizationFailed { .. } => true,
            Self::Api { status, .. } => matches!(status, Some(401 | 403)),
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<solarflow_api::Error> for CoreError {
    fn from(err: solarflow_api::Error) -> Self {
        if err.is_auth_rejected() {
            return CoreError::AuthorizationFailed {
                message: err.to_string(),
            };
        }

        match err {
            solarflow_api::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            solarflow_api::Error::Transport(ref e) if e.is_timeout() => {
                CoreError::Timeout { timeout_ms: 0 }
            }
            solarflow_api::Error::Transport(ref e) if e.is_connect() => {
                CoreError::ConnectionFailed {
                    url: e
                        .url()
                        .map(|u| u.path().to_owned())
                        .unwrap_or_else(|| "<unknown>".into()),
                    reason: e.to_string(),
                }
            }
            solarflow_api::Error::RetriesExhausted { ref last, .. } if last.is_timeout() => {
                match **last {
                    solarflow_api::Error::Timeout { timeout_ms } => {
                        CoreError::Timeout { timeout_ms }
                    }
                    _ => CoreError::Timeout { timeout_ms: 0 },
                }
            }
            solarflow_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            solarflow_api::Error::ClientSetup(message) => CoreError::Internal(message),
            other => CoreError::Api {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}
