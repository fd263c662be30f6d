// Monitoring API wire types
//
// Field names follow the provider's JSON exactly (mixed camelCase and
// upper-case keys). Everything except identifiers is optional or
// defaulted: accounts in the wild omit fields freely.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Numeric site identifier assigned by the provider.
pub type SiteId = u64;

// ── Sites ────────────────────────────────────────────────────────────

/// `GET /sites/list` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct SitesResponse {
    pub sites: SiteList,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteList {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub site: Vec<Site>,
}

/// One installation, as returned by the site listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: SiteId,
    #[serde(default)]
    pub name: String,
    /// Nameplate capacity, in kW.
    #[serde(default)]
    pub peak_power: Option<f64>,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub installation_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub location: Option<SiteLocation>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Site {
    /// The site's city, or `""` when unknown.
    pub fn city(&self) -> &str {
        self.location
            .as_ref()
            .and_then(|l| l.city.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteLocation {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

// ── Inventory ────────────────────────────────────────────────────────

/// `GET /site/{id}/inventory.json` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryResponse {
    #[serde(rename = "Inventory")]
    pub inventory: Inventory,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub inverters: Vec<Inverter>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inverter {
    #[serde(rename = "SN")]
    pub serial: String,
    #[serde(default)]
    pub name: String,
    /// Firmware version, dash separated (`"4-15-123456"`).
    #[serde(rename = "cpuVersion", default)]
    pub cpu_version: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
}

// ── Power flow ───────────────────────────────────────────────────────

/// `GET /site/{id}/currentPowerFlow.json` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PowerFlowResponse {
    #[serde(rename = "siteCurrentPowerFlow")]
    pub power_flow: SiteCurrentPowerFlow,
}

/// Instantaneous power flow of a site, in the unit named by `unit`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SiteCurrentPowerFlow {
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(rename = "GRID", default)]
    pub grid: Option<PowerFlowNode>,
    #[serde(rename = "PV", default)]
    pub pv: Option<PowerFlowNode>,
    #[serde(rename = "LOAD", default)]
    pub load: Option<PowerFlowNode>,
    #[serde(default)]
    pub connections: Vec<PowerFlowConnection>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerFlowNode {
    #[serde(default)]
    pub current_power: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Directed edge: energy currently moves from `from` to `to`.
///
/// The provider is inconsistent about case (`"GRID"` vs `"Load"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerFlowConnection {
    pub from: String,
    pub to: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn site_keeps_unknown_fields() {
        let site: Site = serde_json::from_value(json!({
            "id": 42,
            "name": "Home",
            "peakPower": 6.2,
            "installationDate": "2020-04-01",
            "location": { "city": "Haifa", "country": "Israel" },
            "primaryModule": { "manufacturerName": "LG" }
        }))
        .unwrap();

        assert_eq!(site.id, 42);
        assert_eq!(site.city(), "Haifa");
        assert_eq!(site.peak_power, Some(6.2));
        assert!(site.extra.contains_key("primaryModule"));
    }

    #[test]
    fn power_flow_tolerates_missing_nodes() {
        let flow: SiteCurrentPowerFlow = serde_json::from_value(json!({
            "unit": "kW",
            "PV": { "currentPower": 3.5, "status": "Active" },
            "connections": [{ "from": "PV", "to": "Load" }]
        }))
        .unwrap();

        assert!(flow.grid.is_none());
        assert_eq!(flow.pv.unwrap().current_power, Some(3.5));
        assert_eq!(flow.connections.len(), 1);
    }
}
