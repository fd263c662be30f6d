// ── Raw per-site snapshot ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use solarflow_api::models::{Inventory, Site, SiteCurrentPowerFlow, SiteId};

use super::connection::ConnectionId;

/// Everything fetched for one site in one successful cycle, as the API
/// returned it. Replaced wholesale on the next successful cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSnapshot {
    pub site_id: SiteId,
    pub connection_id: ConnectionId,
    pub site: Site,
    pub inventory: Inventory,
    /// Power values in the provider's unit; never scaled in place.
    pub power_flow: SiteCurrentPowerFlow,
    pub fetched_at: DateTime<Utc>,
}
