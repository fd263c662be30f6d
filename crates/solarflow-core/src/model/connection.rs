// ── Connection identity and lifecycle state ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of one configured account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authorization state of a connection, observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    Unauthorized,
    Authorizing,
    Authorized,
}

impl ConnectionState {
    pub fn is_authorized(self) -> bool {
        matches!(self, Self::Authorized)
    }
}
