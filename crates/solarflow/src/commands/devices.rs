//! `solarflow devices`: one polling cycle, printed as device records.

use tabled::Tabled;

use solarflow_core::{Bridge, DeviceRecord, FlowNodeKind};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::bridge_config;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "PV W")]
    pv: String,
    #[tabled(rename = "Grid")]
    grid: String,
    #[tabled(rename = "History")]
    history: String,
}

impl From<&DeviceRecord> for DeviceRow {
    fn from(r: &DeviceRecord) -> Self {
        Self {
            serial: r.serial.clone(),
            description: r.description.clone(),
            model: r.model.clone(),
            version: r.software_version.clone(),
            site: r.site_id.to_string(),
            pv: format!("{:.0}", r.power_flow.power_watts(FlowNodeKind::Pv)),
            grid: r.power_flow.charging_state().to_string(),
            history: if r.eve_history { "yes" } else { "no" }.into(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let config = bridge_config(global)?;
    let records: Vec<DeviceRecord> = Bridge::oneshot_devices(&config)
        .await?
        .into_values()
        .collect();

    let out = output::render_list(&global.output, &records, |r| DeviceRow::from(r))?;
    output::print_output(&out, global.quiet);
    Ok(())
}
