// solarflow-core: polling pipeline between solarflow-api and a device host.

pub mod aggregator;
pub mod bridge;
pub mod config;
pub mod convert;
pub mod error;
pub mod manager;
pub mod model;
pub mod normalize;
pub mod registry;
pub mod shutdown;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use aggregator::{CycleReport, SiteDataAggregator};
pub use bridge::{Bridge, BridgeContext};
pub use config::{BackoffConfig, BridgeConfig, ConnectionConfig};
pub use error::CoreError;
pub use manager::{AuthBackoff, ConnectionManager, ConnectionSlot};
pub use normalize::{NormalizeOptions, normalize, sanitize};
pub use registry::{DeviceRegistry, DeviceSink, ReconcileReport};
pub use shutdown::ShutdownGate;
pub use store::SnapshotCache;

// Wire types that appear in the public API.
pub use solarflow_api::models::{Site, SiteId};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ChargingState, ConnectionId, ConnectionState, DeviceIdentity, DeviceRecord, FlowEdge,
    FlowNode, FlowNodeKind, HistorySample, PowerFlowReading, PowerUnit, SiteSnapshot,
    TrackedDevice,
};
