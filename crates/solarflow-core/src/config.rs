// ── Runtime bridge configuration ──
//
// Describes which accounts to poll and how. Carries credentials and timing,
// but never touches disk: the config crate (or a test) builds a
// `BridgeConfig` and hands it in.

use std::collections::HashMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::CoreError;
use crate::model::ConnectionId;
use crate::normalize::NormalizeOptions;

pub use solarflow_api::DEFAULT_BASE_URL;

/// One monitoring account.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub id: ConnectionId,
    pub api_key: SecretString,
}

impl ConnectionConfig {
    pub fn new(id: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            id: ConnectionId::new(id),
            api_key,
        }
    }
}

/// Authorization retry schedule: `initial`, doubled per consecutive
/// failure, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(15),
            max: Duration::from_secs(60),
        }
    }
}

/// Everything the bridge needs to run.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Monitoring API root.
    pub base_url: Url,
    pub connections: Vec<ConnectionConfig>,
    /// History logging for every device.
    pub eve_history: bool,
    /// Per-serial history overrides. Keys are upper-cased on insertion.
    pub eve_history_overrides: HashMap<String, bool>,
    /// Delay between polling cycles of one connection.
    pub poll_interval: Duration,
    /// Per-request timeout for site endpoints.
    pub request_timeout: Duration,
    /// Attempts per site endpoint request.
    pub request_retries: u32,
    pub auth_backoff: BackoffConfig,
}

impl BridgeConfig {
    pub fn new(base_url: Url, connections: Vec<ConnectionConfig>) -> Self {
        Self {
            base_url,
            connections,
            eve_history: false,
            eve_history_overrides: HashMap::new(),
            poll_interval: Duration::from_secs(600),
            request_timeout: solarflow_api::DEFAULT_REQUEST_TIMEOUT,
            request_retries: solarflow_api::fetch::DEFAULT_MAX_RETRIES,
            auth_backoff: BackoffConfig::default(),
        }
    }

    /// Set the history override for one serial (case-insensitive).
    pub fn with_eve_history_override(mut self, serial: &str, enabled: bool) -> Self {
        self.eve_history_overrides
            .insert(serial.to_uppercase(), enabled);
        self
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            eve_history: self.eve_history,
            eve_history_overrides: self
                .eve_history_overrides
                .iter()
                .map(|(k, v)| (k.to_uppercase(), *v))
                .collect(),
        }
    }

    /// Reject configurations the bridge cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.connections.is_empty() {
            return Err(CoreError::Config {
                message: "no accounts configured".into(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for conn in &self.connections {
            if conn.id.as_str().trim().is_empty() {
                return Err(CoreError::Config {
                    message: "account name must not be empty".into(),
                });
            }
            if !seen.insert(conn.id.as_str()) {
                return Err(CoreError::Config {
                    message: format!("duplicate account name '{}'", conn.id),
                });
            }
            if conn.api_key.expose_secret().trim().is_empty() {
                return Err(CoreError::Config {
                    message: format!("account '{}' has no API key", conn.id),
                });
            }
        }

        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        if self.auth_backoff.initial.is_zero() || self.auth_backoff.max < self.auth_backoff.initial
        {
            return Err(CoreError::Config {
                message: "auth backoff must start above zero and not exceed its cap".into(),
            });
        }

        Ok(())
    }
}
