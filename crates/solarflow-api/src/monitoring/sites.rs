// Monitoring API endpoints
//
// The account-level endpoints (`/version/current`, `/sites/list`) and the
// two per-site endpoints the poller joins: inventory and current power flow.

use tracing::debug;

use crate::error::Error;
use crate::fetch::FetchOptions;
use crate::monitoring::client::MonitoringClient;
use crate::monitoring::models::{
    Inventory, InventoryResponse, PowerFlowResponse, Site, SiteCurrentPowerFlow, SiteId,
    SitesResponse,
};

impl MonitoringClient {
    /// Validate the API key.
    ///
    /// `GET /version/current` is the cheapest call that still requires a
    /// valid key. The body is discarded. Single attempt: the caller owns
    /// the retry schedule for authorization.
    pub async fn authorize(&self) -> Result<(), Error> {
        let url = self.api_url("version/current", &[])?;
        let options = FetchOptions::new()
            .timeout(self.request_timeout())
            .max_retries(1);
        self.get_raw(&url, &options).await?;
        debug!("api key accepted");
        Ok(())
    }

    /// List all sites visible to the account, sorted by name.
    ///
    /// `GET /sites/list?sortProperty=name&sortOrder=ASC`
    pub async fn list_sites(&self) -> Result<Vec<Site>, Error> {
        let url = self.api_url(
            "sites/list",
            &[("sortProperty", "name"), ("sortOrder", "ASC")],
        )?;
        let resp: SitesResponse = self.get_json(&url, &self.endpoint_options()).await?;
        debug!(count = resp.sites.site.len(), "listed sites");
        Ok(resp.sites.site)
    }

    /// Equipment installed at a site.
    ///
    /// `GET /site/{id}/inventory.json`
    pub async fn site_inventory(&self, site_id: SiteId) -> Result<Inventory, Error> {
        let url = self.api_url(&format!("site/{site_id}/inventory.json"), &[])?;
        let resp: InventoryResponse = self.get_json(&url, &self.endpoint_options()).await?;
        Ok(resp.inventory)
    }

    /// Instantaneous power flow at a site, in the unit the provider chose.
    ///
    /// `GET /site/{id}/currentPowerFlow.json`
    pub async fn current_power_flow(&self, site_id: SiteId) -> Result<SiteCurrentPowerFlow, Error> {
        let url = self.api_url(&format!("site/{site_id}/currentPowerFlow.json"), &[])?;
        let resp: PowerFlowResponse = self.get_json(&url, &self.endpoint_options()).await?;
        Ok(resp.power_flow)
    }
}
