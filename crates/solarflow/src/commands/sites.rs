//! `solarflow sites`: list every account's sites.

use serde::Serialize;
use tabled::Tabled;

use solarflow_core::{Bridge, ConnectionId, Site};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::bridge_config;

#[derive(Serialize)]
struct SiteEntry {
    account: ConnectionId,
    #[serde(flatten)]
    site: Site,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "City")]
    city: String,
    #[tabled(rename = "Peak kW")]
    peak: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&SiteEntry> for SiteRow {
    fn from(e: &SiteEntry) -> Self {
        Self {
            account: e.account.to_string(),
            id: e.site.id.to_string(),
            name: e.site.name.clone(),
            city: output::or_dash(Some(e.site.city().to_owned()).filter(|c| !c.is_empty())),
            peak: output::or_dash(e.site.peak_power.map(|p| format!("{p:.2}"))),
            status: output::or_dash(e.site.status.clone()),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let config = bridge_config(global)?;
    let entries: Vec<SiteEntry> = Bridge::list_sites(&config)
        .await?
        .into_iter()
        .flat_map(|(account, sites)| {
            sites.into_iter().map(move |site| SiteEntry {
                account: account.clone(),
                site,
            })
        })
        .collect();

    let out = output::render_list(&global.output, &entries, |e| SiteRow::from(e))?;
    output::print_output(&out, global.quiet);
    Ok(())
}
