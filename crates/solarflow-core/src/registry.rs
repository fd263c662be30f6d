// ── Device tracking and dispatch ──
//
// Remembers every serial ever observed and routes normalized records to
// the host sink: first sighting instantiates (unless excluded), later
// sightings update. Excluded serials stay excluded for the registry's
// lifetime.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info};

use crate::model::{DeviceIdentity, DeviceRecord, FlowNodeKind, HistorySample, TrackedDevice};

/// The host accessory framework, as seen from the bridge.
///
/// Calls are fire-and-forget: the registry does not wait on or inspect
/// anything the host does with a record beyond the identity it returns.
pub trait DeviceSink: Send + Sync {
    /// Create a device for a record seen for the first time.
    fn instantiate(&self, record: &DeviceRecord) -> DeviceIdentity;

    /// Push fresh data to a previously instantiated device.
    fn update(&self, identity: &DeviceIdentity, record: &DeviceRecord);

    /// Append a history sample for devices with history logging enabled.
    fn record_history(&self, identity: &DeviceIdentity, sample: &HistorySample) {
        let _ = (identity, sample);
    }
}

/// Outcome of one [`DeviceRegistry::reconcile`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub instantiated: usize,
    /// Serials seen for the first time while excluded.
    pub excluded: usize,
    pub updated: usize,
}

enum Sighting {
    First,
    Excluded,
    Known(DeviceIdentity),
    /// Excluded, or still being instantiated by another reconcile.
    Ignored,
}

pub struct DeviceRegistry {
    tracked: DashMap<String, TrackedDevice>,
    sink: Arc<dyn DeviceSink>,
}

impl DeviceRegistry {
    pub fn new(sink: Arc<dyn DeviceSink>) -> Self {
        Self {
            tracked: DashMap::new(),
            sink,
        }
    }

    /// Route one normalization result to the sink.
    ///
    /// The sink is called with no registry lock held, so a host may read
    /// the registry from inside its callbacks.
    pub fn reconcile(&self, records: &BTreeMap<String, DeviceRecord>) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for (serial, record) in records {
            match self.observe(serial, record.excluded) {
                Sighting::First => {
                    let identity = self.sink.instantiate(record);
                    info!(serial = %serial, identity = %identity, "device instantiated");
                    self.tracked
                        .insert(serial.clone(), TrackedDevice::Active(identity.clone()));
                    report.instantiated += 1;
                    self.forward_history(&identity, record);
                }
                Sighting::Excluded => {
                    debug!(serial = %serial, "device excluded on first sighting");
                    report.excluded += 1;
                }
                Sighting::Known(identity) => {
                    self.sink.update(&identity, record);
                    report.updated += 1;
                    self.forward_history(&identity, record);
                }
                Sighting::Ignored => {}
            }
        }

        report
    }

    /// Classify one serial, claiming it on first sighting. The shard lock
    /// is released on return.
    fn observe(&self, serial: &str, excluded: bool) -> Sighting {
        match self.tracked.entry(serial.to_owned()) {
            Entry::Vacant(slot) if excluded => {
                slot.insert(TrackedDevice::Excluded);
                Sighting::Excluded
            }
            // Claimed before the sink runs, so two reconciles cannot both
            // instantiate one serial.
            Entry::Vacant(slot) => {
                slot.insert(TrackedDevice::Pending);
                Sighting::First
            }
            Entry::Occupied(entry) => match entry.get().identity() {
                Some(identity) => Sighting::Known(identity.clone()),
                None => Sighting::Ignored,
            },
        }
    }

    fn forward_history(&self, identity: &DeviceIdentity, record: &DeviceRecord) {
        if !record.eve_history {
            return;
        }
        let sample = HistorySample {
            timestamp: Utc::now(),
            power_watts: record.power_flow.power_watts(FlowNodeKind::Pv),
        };
        self.sink.record_history(identity, &sample);
    }

    pub fn tracked(&self, serial: &str) -> Option<TrackedDevice> {
        self.tracked.get(serial).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    pub fn clear(&self) {
        self.tracked.clear();
    }
}
