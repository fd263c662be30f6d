//! Configuration for the solarflow bridge.
//!
//! TOML file + `SOLARFLOW_` environment overrides, per-account credential
//! resolution (env var + keyring + plaintext), and translation to
//! `solarflow_core::BridgeConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use solarflow_core::{BackoffConfig, BridgeConfig, ConnectionConfig};

/// Keyring service name under which API keys are stored.
pub const KEYRING_SERVICE: &str = "solarflow";

const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for account '{account}'")]
    NoCredentials { account: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Monitoring API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// History logging for every device.
    #[serde(default)]
    pub eve_history: bool,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Attempts per site endpoint request.
    #[serde(default = "default_request_retries")]
    pub request_retries: u32,

    #[serde(default = "default_auth_backoff_initial")]
    pub auth_backoff_initial_secs: u64,

    #[serde(default = "default_auth_backoff_max")]
    pub auth_backoff_max_secs: u64,

    /// Monitoring accounts to poll.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,

    /// Per-device settings, keyed by inverter serial.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            eve_history: false,
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
            request_retries: default_request_retries(),
            auth_backoff_initial_secs: default_auth_backoff_initial(),
            auth_backoff_max_secs: default_auth_backoff_max(),
            accounts: Vec::new(),
            devices: BTreeMap::new(),
        }
    }
}

fn default_base_url() -> String {
    solarflow_core::config::DEFAULT_BASE_URL.into()
}
fn default_poll_interval() -> u64 {
    600
}
fn default_request_timeout() -> u64 {
    30
}
fn default_request_retries() -> u32 {
    3
}
fn default_auth_backoff_initial() -> u64 {
    15
}
fn default_auth_backoff_max() -> u64 {
    60
}

/// One monitoring account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
    /// Account name; doubles as the connection id.
    pub name: String,

    /// API key (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeviceSettings {
    #[serde(default)]
    pub eve_history: bool,
}

impl Config {
    /// A copy safe to print: plaintext API keys are masked.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        for account in &mut cfg.accounts {
            if account.api_key.is_some() {
                account.api_key = Some(REDACTED.into());
            }
        }
        cfg
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "solarflow", "solarflow").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("solarflow");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
///
/// `path` overrides the platform config path. A missing file is not an
/// error: defaults and environment still apply. Nested keys in the
/// environment use `__` (`SOLARFLOW_POLL_INTERVAL_SECS`).
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("SOLARFLOW_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve an account's API key: `api_key_env` variable, then the system
/// keyring, then the plaintext `api_key`.
pub fn resolve_api_key(account: &AccountConfig) -> Result<SecretString, ConfigError> {
    // 1. Account's api_key_env → env var lookup
    if let Some(ref env_name) = account.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{}/api-key", account.name)) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = account.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        account: account.name.clone(),
    })
}

// ── Translation ─────────────────────────────────────────────────────

/// Build the runtime `BridgeConfig`, resolving every account's key.
pub fn to_bridge_config(cfg: &Config) -> Result<BridgeConfig, ConfigError> {
    let base_url: url::Url = cfg.base_url.parse().map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: {}", cfg.base_url),
    })?;

    let connections = cfg
        .accounts
        .iter()
        .map(|account| {
            let key = resolve_api_key(account)?;
            Ok(ConnectionConfig::new(account.name.clone(), key))
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let mut bridge = BridgeConfig::new(base_url, connections);
    bridge.eve_history = cfg.eve_history;
    bridge.poll_interval = Duration::from_secs(cfg.poll_interval_secs);
    bridge.request_timeout = Duration::from_secs(cfg.request_timeout_secs);
    bridge.request_retries = cfg.request_retries;
    bridge.auth_backoff = BackoffConfig {
        initial: Duration::from_secs(cfg.auth_backoff_initial_secs),
        max: Duration::from_secs(cfg.auth_backoff_max_secs),
    };
    for (serial, settings) in &cfg.devices {
        bridge = bridge.with_eve_history_override(serial, settings.eve_history);
    }

    bridge.validate().map_err(|e| ConfigError::Validation {
        field: "config".into(),
        reason: e.to_string(),
    })?;
    Ok(bridge)
}
