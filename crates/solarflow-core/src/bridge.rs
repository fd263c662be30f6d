// ── Bridge orchestration ──
//
// `BridgeContext` owns the state shared by every connection task: the
// snapshot cache, the device registry and the shutdown gate. `Bridge`
// wires a `BridgeConfig` into clients, a `ConnectionManager` and that
// context, and is what consumers hold.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use solarflow_api::models::Site;
use solarflow_api::{HttpFetcher, MonitoringClient, TransportConfig};

use crate::aggregator::{CycleReport, SiteDataAggregator};
use crate::config::BridgeConfig;
use crate::error::CoreError;
use crate::manager::{ConnectionManager, ConnectionSlot};
use crate::model::{ConnectionId, ConnectionState, DeviceRecord};
use crate::normalize::{NormalizeOptions, normalize};
use crate::registry::{DeviceRegistry, DeviceSink, ReconcileReport};
use crate::shutdown::ShutdownGate;
use crate::store::SnapshotCache;

// ── BridgeContext ────────────────────────────────────────────────

pub struct BridgeContext {
    cache: Arc<SnapshotCache>,
    registry: DeviceRegistry,
    options: NormalizeOptions,
    gate: Arc<ShutdownGate>,
}

impl BridgeContext {
    pub fn new(sink: Arc<dyn DeviceSink>, options: NormalizeOptions) -> Self {
        Self {
            cache: Arc::new(SnapshotCache::new()),
            registry: DeviceRegistry::new(sink),
            options,
            gate: Arc::new(ShutdownGate::new()),
        }
    }

    pub fn cache(&self) -> Arc<SnapshotCache> {
        Arc::clone(&self.cache)
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        self.gate.token()
    }

    pub fn gate(&self) -> Arc<ShutdownGate> {
        Arc::clone(&self.gate)
    }

    /// Device records derived from the current cache contents.
    pub fn normalized(&self) -> BTreeMap<String, DeviceRecord> {
        let snapshots = self.cache.snapshot();
        normalize(snapshots.iter().map(AsRef::as_ref), &self.options)
    }

    /// Normalize the whole cache and route the result to the sink.
    /// Returns `None` once shutdown has begun.
    pub fn propagate(&self) -> Option<ReconcileReport> {
        self.gate.run(|| self.registry.reconcile(&self.normalized()))
    }

    /// Begin shutdown, wait for running commits and propagations, then
    /// empty the cache and the registry.
    pub fn clear(&self) {
        self.gate.close_with(|| {
            self.cache.clear();
            self.registry.clear();
        });
    }
}

// ── Bridge ───────────────────────────────────────────────────────

/// Entry point for consumers.
///
/// Cheaply cloneable via `Arc<BridgeInner>`. [`new`](Self::new) builds
/// everything without touching the network; [`start`](Self::start)
/// spawns the connection tasks.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: BridgeConfig,
    context: Arc<BridgeContext>,
    manager: ConnectionManager,
}

impl Bridge {
    pub fn new(config: BridgeConfig, sink: Arc<dyn DeviceSink>) -> Result<Self, CoreError> {
        config.validate()?;

        let context = Arc::new(BridgeContext::new(sink, config.normalize_options()));
        let slots = build_clients(&config)?
            .into_iter()
            .map(|(id, client)| ConnectionSlot::new(id, client))
            .collect();
        let manager = ConnectionManager::new(
            slots,
            Arc::clone(&context),
            config.poll_interval,
            config.auth_backoff,
        );

        Ok(Self {
            inner: Arc::new(BridgeInner {
                config,
                context,
                manager,
            }),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.inner.context
    }

    /// Spawn the per-connection authorize-and-poll tasks.
    pub async fn start(&self) {
        info!(
            connections = self.inner.config.connections.len(),
            poll_interval_secs = self.inner.config.poll_interval.as_secs(),
            "starting bridge"
        );
        self.inner.manager.start().await;
    }

    // ── State observation ────────────────────────────────────────

    pub fn connection_states(&self) -> Vec<(ConnectionId, ConnectionState)> {
        self.inner.manager.states()
    }

    /// Subscribe to one connection's state changes.
    pub fn subscribe_connection(&self, id: &ConnectionId) -> Option<watch::Receiver<ConnectionState>> {
        self.inner.manager.slot(id).map(|slot| slot.subscribe())
    }

    /// Current device records, derived from the cache.
    pub fn devices(&self) -> BTreeMap<String, DeviceRecord> {
        self.inner.context.normalized()
    }

    /// Stop polling and drop all cached state.
    pub async fn shutdown(&self) {
        self.inner.manager.shutdown().await;
        self.inner.context.clear();
        info!("bridge shut down");
    }

    // ── One-shot helpers ─────────────────────────────────────────

    /// List the sites of every configured account, without starting the
    /// bridge.
    pub async fn list_sites(
        config: &BridgeConfig,
    ) -> Result<Vec<(ConnectionId, Vec<Site>)>, CoreError> {
        config.validate()?;

        let mut out = Vec::with_capacity(config.connections.len());
        for (id, client) in build_clients(config)? {
            let sites = client.list_sites().await?;
            debug!(connection = %id, count = sites.len(), "listed sites");
            out.push((id, sites));
        }
        Ok(out)
    }

    /// Authorize every account once, run a single aggregation cycle each
    /// and return the normalized device records.
    pub async fn oneshot_devices(
        config: &BridgeConfig,
    ) -> Result<BTreeMap<String, DeviceRecord>, CoreError> {
        config.validate()?;

        let cache = Arc::new(SnapshotCache::new());
        let aggregator = SiteDataAggregator::new(Arc::clone(&cache), Arc::new(ShutdownGate::new()));

        for (id, client) in build_clients(config)? {
            client.authorize().await?;
            let CycleReport { committed, skipped, .. } = aggregator.run_cycle(&id, &client).await?;
            debug!(connection = %id, committed, skipped, "one-shot cycle");
        }

        let snapshots = cache.snapshot();
        Ok(normalize(
            snapshots.iter().map(AsRef::as_ref),
            &config.normalize_options(),
        ))
    }
}

/// One client per account, sharing a single connection pool.
fn build_clients(config: &BridgeConfig) -> Result<Vec<(ConnectionId, MonitoringClient)>, CoreError> {
    let fetcher = HttpFetcher::from_transport(&TransportConfig::default())?;

    Ok(config
        .connections
        .iter()
        .map(|conn| {
            let client = MonitoringClient::with_fetcher(
                fetcher.clone(),
                config.base_url.clone(),
                conn.api_key.clone(),
            )
            .with_request_policy(config.request_timeout, config.request_retries);
            (conn.id.clone(), client)
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use chrono::Utc;
    use solarflow_api::models::{Inventory, Inverter, SiteCurrentPowerFlow};

    use crate::model::{DeviceIdentity, SiteSnapshot};

    /// Signals when instantiation starts, then takes a while to finish.
    struct SlowSink {
        entered: Mutex<Option<mpsc::Sender<()>>>,
    }

    impl DeviceSink for SlowSink {
        fn instantiate(&self, record: &DeviceRecord) -> DeviceIdentity {
            if let Some(tx) = self.entered.lock().unwrap().take() {
                tx.send(()).unwrap();
            }
            thread::sleep(Duration::from_millis(100));
            DeviceIdentity::new(record.serial.clone())
        }

        fn update(&self, _: &DeviceIdentity, _: &DeviceRecord) {}
    }

    fn snapshot() -> SiteSnapshot {
        SiteSnapshot {
            site_id: 1,
            connection_id: ConnectionId::new("home"),
            site: Site {
                id: 1,
                name: "Home".into(),
                peak_power: None,
                installation_date: None,
                status: None,
                location: None,
                extra: serde_json::Map::new(),
            },
            inventory: Inventory {
                inverters: vec![Inverter {
                    serial: "aa-1".into(),
                    name: "Roof".into(),
                    cpu_version: None,
                    model: None,
                    manufacturer: None,
                }],
                extra: serde_json::Map::new(),
            },
            power_flow: SiteCurrentPowerFlow::default(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn clear_waits_for_running_propagation() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let sink = Arc::new(SlowSink {
            entered: Mutex::new(Some(entered_tx)),
        });
        let context = Arc::new(BridgeContext::new(sink, NormalizeOptions::default()));
        context.cache().commit(snapshot());

        let worker = {
            let context = Arc::clone(&context);
            thread::spawn(move || context.propagate())
        };
        entered_rx.recv().unwrap();
        context.clear();

        assert_eq!(worker.join().unwrap().map(|r| r.instantiated), Some(1));
        assert!(context.registry().is_empty());
        assert!(context.cache().is_empty());
    }

    #[test]
    fn nothing_propagates_after_clear() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let sink = Arc::new(SlowSink {
            entered: Mutex::new(Some(entered_tx)),
        });
        let context = BridgeContext::new(sink, NormalizeOptions::default());

        context.clear();
        context.cache().commit(snapshot());

        assert_eq!(context.propagate(), None);
        assert!(context.registry().is_empty());
        assert!(entered_rx.try_recv().is_err());
    }
}
