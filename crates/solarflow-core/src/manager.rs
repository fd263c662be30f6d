// ── Connection lifecycle ──
//
// One independent task per configured account: authorize with backoff,
// then poll on a fixed delay until shutdown or until the API rejects the
// key, in which case the connection goes back to authorization.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use solarflow_api::MonitoringClient;

use crate::aggregator::SiteDataAggregator;
use crate::bridge::BridgeContext;
use crate::config::BackoffConfig;
use crate::model::{ConnectionId, ConnectionState};

// ── AuthBackoff ──────────────────────────────────────────────────

/// Exponential delay between authorization attempts.
///
/// The first failure waits `initial`, each consecutive failure doubles
/// the wait, capped at `max`. A success resets the schedule.
#[derive(Debug, Clone)]
pub struct AuthBackoff {
    config: BackoffConfig,
    failures: u32,
}

impl AuthBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before retrying.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.failures);
        self.failures = self.failures.saturating_add(1);
        self.config
            .initial
            .saturating_mul(factor)
            .min(self.config.max)
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Consecutive failures since the last reset.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

// ── ConnectionSlot ───────────────────────────────────────────────

/// A configured account with its client and observable state.
pub struct ConnectionSlot {
    id: ConnectionId,
    client: MonitoringClient,
    state: watch::Sender<ConnectionState>,
}

impl ConnectionSlot {
    pub fn new(id: ConnectionId, client: MonitoringClient) -> Self {
        let (state, _) = watch::channel(ConnectionState::Unauthorized);
        Self { id, client, state }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn client(&self) -> &MonitoringClient {
        &self.client
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_authorized(&self) -> bool {
        self.state().is_authorized()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            let changed = *current != next;
            *current = next;
            changed
        });
    }
}

// ── ConnectionManager ────────────────────────────────────────────

/// Owns the connection slots and their background tasks.
pub struct ConnectionManager {
    slots: DashMap<ConnectionId, Arc<ConnectionSlot>>,
    context: Arc<BridgeContext>,
    poll_interval: Duration,
    auth_backoff: BackoffConfig,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(
        slots: Vec<ConnectionSlot>,
        context: Arc<BridgeContext>,
        poll_interval: Duration,
        auth_backoff: BackoffConfig,
    ) -> Self {
        Self {
            slots: slots
                .into_iter()
                .map(|slot| (slot.id.clone(), Arc::new(slot)))
                .collect(),
            context,
            poll_interval,
            auth_backoff,
            task_handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn one lifecycle task per connection. Calling this again while
    /// tasks are running is a no-op.
    pub async fn start(&self) {
        let mut handles = self.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("connection tasks already running");
            return;
        }

        let cancel = self.context.shutdown_token().child_token();
        for slot in self.slots() {
            info!(connection = %slot.id, "starting connection");
            handles.push(tokio::spawn(connection_task(
                slot,
                Arc::clone(&self.context),
                self.poll_interval,
                self.auth_backoff,
                cancel.clone(),
            )));
        }
    }

    /// All slots, ordered by connection id.
    pub fn slots(&self) -> Vec<Arc<ConnectionSlot>> {
        let mut slots: Vec<Arc<ConnectionSlot>> =
            self.slots.iter().map(|r| Arc::clone(r.value())).collect();
        slots.sort_by(|a, b| a.id.cmp(&b.id));
        slots
    }

    pub fn slot(&self, id: &ConnectionId) -> Option<Arc<ConnectionSlot>> {
        self.slots.get(id).map(|r| Arc::clone(r.value()))
    }

    pub fn states(&self) -> Vec<(ConnectionId, ConnectionState)> {
        self.slots()
            .into_iter()
            .map(|slot| (slot.id.clone(), slot.state()))
            .collect()
    }

    /// Forget every connection and detach the running tasks.
    ///
    /// Tasks observe cancellation at their next sleep; an in-flight cycle
    /// finishes its requests but no longer commits.
    pub async fn shutdown(&self) {
        self.context.shutdown_token().cancel();
        let detached = self.task_handles.lock().await.drain(..).count();
        for slot in self.slots() {
            slot.set_state(ConnectionState::Unauthorized);
        }
        self.slots.clear();
        debug!(tasks = detached, "connection manager shut down");
    }
}

// ── Background tasks ─────────────────────────────────────────────

enum PollExit {
    Cancelled,
    /// The API rejected the key mid-polling.
    Unauthorized,
}

/// Authorize-then-poll loop for one connection. Never returns an error:
/// every failure is logged and retried.
async fn connection_task(
    slot: Arc<ConnectionSlot>,
    context: Arc<BridgeContext>,
    poll_interval: Duration,
    backoff: BackoffConfig,
    cancel: CancellationToken,
) {
    let aggregator = SiteDataAggregator::new(context.cache(), context.gate());
    let mut backoff = AuthBackoff::new(backoff);

    loop {
        slot.set_state(ConnectionState::Authorizing);
        match slot.client.authorize().await {
            Ok(()) => {
                backoff.reset();
                slot.set_state(ConnectionState::Authorized);
                info!(connection = %slot.id, "connection authorized");

                match poll_loop(&slot, &aggregator, &context, poll_interval, &cancel).await {
                    PollExit::Cancelled => break,
                    PollExit::Unauthorized => {
                        slot.set_state(ConnectionState::Unauthorized);
                        warn!(connection = %slot.id, "api key rejected while polling, re-authorizing");
                    }
                }
            }
            Err(e) => {
                slot.set_state(ConnectionState::Unauthorized);
                warn!(
                    connection = %slot.id,
                    error = %e,
                    failures = backoff.failures() + 1,
                    "authorization failed"
                );
            }
        }

        let delay = backoff.next_delay();
        debug!(connection = %slot.id, retry_in_ms = delay.as_millis(), "scheduling authorization");
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    slot.set_state(ConnectionState::Unauthorized);
    debug!(connection = %slot.id, "connection task stopped");
}

/// Poll immediately, then every `poll_interval` after the previous cycle
/// finished.
async fn poll_loop(
    slot: &ConnectionSlot,
    aggregator: &SiteDataAggregator,
    context: &BridgeContext,
    poll_interval: Duration,
    cancel: &CancellationToken,
) -> PollExit {
    loop {
        if cancel.is_cancelled() {
            return PollExit::Cancelled;
        }

        match aggregator.run_cycle(&slot.id, &slot.client).await {
            Ok(_) => {
                if let Some(report) = context.propagate() {
                    debug!(
                        connection = %slot.id,
                        instantiated = report.instantiated,
                        excluded = report.excluded,
                        updated = report.updated,
                        "devices propagated"
                    );
                }
            }
            Err(e) if e.is_auth_rejected() => return PollExit::Unauthorized,
            Err(e) => warn!(connection = %slot.id, error = %e, "site listing failed"),
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return PollExit::Cancelled,
            () = tokio::time::sleep(poll_interval) => {}
        }
    }
}
