//! `solarflow run`: poll until interrupted.

use std::sync::Arc;

use tracing::{debug, info, warn};

use solarflow_core::{
    Bridge, DeviceIdentity, DeviceRecord, DeviceSink, FlowNodeKind, HistorySample,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::bridge_config;

// ── Logging sink ────────────────────────────────────────────────────

/// Device host that reports every call as a structured tracing event.
pub struct LoggingSink;

impl DeviceSink for LoggingSink {
    fn instantiate(&self, record: &DeviceRecord) -> DeviceIdentity {
        let identity = DeviceIdentity::new(uuid::Uuid::new_v4().to_string());
        info!(
            identity = %identity,
            serial = %record.serial,
            description = %record.description,
            model = %record.model,
            version = %record.software_version,
            site_id = record.site_id,
            eve_history = record.eve_history,
            "device added"
        );
        identity
    }

    fn update(&self, identity: &DeviceIdentity, record: &DeviceRecord) {
        let reading = &record.power_flow;
        let charging = reading.charging_state();
        info!(
            identity = %identity,
            serial = %record.serial,
            pv_w = reading.power_watts(FlowNodeKind::Pv),
            load_w = reading.power_watts(FlowNodeKind::Load),
            grid_w = reading.power_watts(FlowNodeKind::Grid),
            grid = %charging,
            low_battery = ?charging.low_battery(),
            online = record.online,
            "device updated"
        );
    }

    fn record_history(&self, identity: &DeviceIdentity, sample: &HistorySample) {
        debug!(
            identity = %identity,
            timestamp = %sample.timestamp.to_rfc3339(),
            power_w = sample.power_watts,
            "history sample"
        );
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let config = bridge_config(global)?;
    let bridge = Bridge::new(config, Arc::new(LoggingSink))?;

    let watchers: Vec<_> = bridge
        .connection_states()
        .into_iter()
        .filter_map(|(id, _)| bridge.subscribe_connection(&id).map(|rx| (id, rx)))
        .map(|(id, mut rx)| {
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let state = *rx.borrow_and_update();
                    info!(connection = %id, state = %state, "connection state changed");
                }
            })
        })
        .collect();

    bridge.start().await;

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl-C, shutting down");
    }
    info!("interrupt received, shutting down");

    bridge.shutdown().await;
    for watcher in watchers {
        watcher.abort();
    }
    Ok(())
}
