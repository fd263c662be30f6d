// ── Device domain types ──

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use solarflow_api::models::SiteId;

use super::power_flow::PowerFlowReading;

/// Stable handle the sink hands back for an instantiated device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeviceIdentity {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// The canonical per-inverter record, rebuilt from the snapshot cache on
/// every cycle. Identity is `serial`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct DeviceRecord {
    /// Upper-cased inverter serial number.
    pub serial: String,
    /// Firmware version, dot separated.
    pub software_version: String,
    pub model: String,
    pub manufacturer: String,
    pub site_id: SiteId,
    pub installation_date: Option<NaiveDate>,
    /// Display name, sanitized for the host framework.
    pub description: String,
    /// Site peak power in watts.
    pub peak_power: Option<f64>,
    /// The owning site's power flow, in watts.
    pub power_flow: PowerFlowReading,
    pub online: bool,
    pub excluded: bool,
    pub eve_history: bool,
}

/// Registry entry for a serial number that has been observed at least once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedDevice {
    /// First sighting claimed; the host is still instantiating it.
    Pending,
    Active(DeviceIdentity),
    /// Seen while excluded; never instantiated.
    Excluded,
}

impl TrackedDevice {
    pub fn is_excluded(&self) -> bool {
        matches!(self, Self::Excluded)
    }

    pub fn identity(&self) -> Option<&DeviceIdentity> {
        match self {
            Self::Active(identity) => Some(identity),
            Self::Pending | Self::Excluded => None,
        }
    }
}

/// One history point for devices with history logging enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub timestamp: DateTime<Utc>,
    /// PV production in watts.
    pub power_watts: f64,
}
