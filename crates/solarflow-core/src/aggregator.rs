// ── Per-connection fetch-and-join cycle ──
//
// Lists a connection's sites, then fetches inventory and current power
// flow for every site concurrently. A site commits to the snapshot cache
// only when both of its fetches succeed.

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{debug, info};

use solarflow_api::MonitoringClient;
use solarflow_api::models::Site;

use crate::error::CoreError;
use crate::model::{ConnectionId, SiteSnapshot};
use crate::shutdown::ShutdownGate;
use crate::store::SnapshotCache;

/// Outcome of one [`SiteDataAggregator::run_cycle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Sites listed by the account.
    pub sites: usize,
    pub committed: usize,
    /// Sites whose inventory or power flow could not be fetched.
    pub skipped: usize,
}

pub struct SiteDataAggregator {
    cache: Arc<SnapshotCache>,
    gate: Arc<ShutdownGate>,
}

impl SiteDataAggregator {
    pub fn new(cache: Arc<SnapshotCache>, gate: Arc<ShutdownGate>) -> Self {
        Self { cache, gate }
    }

    /// Run one cycle for `connection`.
    ///
    /// Fails only when the site listing fails; per-site failures are
    /// counted as skipped. Once shutdown has begun nothing is committed.
    pub async fn run_cycle(
        &self,
        connection: &ConnectionId,
        client: &MonitoringClient,
    ) -> Result<CycleReport, CoreError> {
        let sites = client.list_sites().await?;
        let total = sites.len();

        let outcomes = join_all(
            sites
                .into_iter()
                .map(|site| self.fetch_site(connection, client, site)),
        )
        .await;

        let committed = outcomes.iter().filter(|ok| **ok).count();
        let report = CycleReport {
            sites: total,
            committed,
            skipped: total - committed,
        };

        info!(
            connection = %connection,
            sites = report.sites,
            committed = report.committed,
            skipped = report.skipped,
            "polling cycle complete"
        );
        Ok(report)
    }

    /// Fetch both endpoints of one site and commit on success.
    async fn fetch_site(
        &self,
        connection: &ConnectionId,
        client: &MonitoringClient,
        site: Site,
    ) -> bool {
        let site_id = site.id;
        let (inventory, power_flow) = tokio::join!(
            client.site_inventory(site_id),
            client.current_power_flow(site_id),
        );

        let (inventory, power_flow) = match (inventory, power_flow) {
            (Ok(inventory), Ok(power_flow)) => (inventory, power_flow),
            (inventory, power_flow) => {
                for err in [inventory.err(), power_flow.err()].into_iter().flatten() {
                    if !err.is_timeout() {
                        debug!(connection = %connection, site_id, error = %err, "site fetch failed");
                    }
                }
                return false;
            }
        };

        let snapshot = SiteSnapshot {
            site_id,
            connection_id: connection.clone(),
            site,
            inventory,
            power_flow,
            fetched_at: Utc::now(),
        };
        self.gate.run(|| self.cache.commit(snapshot)).is_some()
    }
}
