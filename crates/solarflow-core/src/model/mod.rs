// ── Domain model ──
//
// Canonical types produced by the polling pipeline: connection identity,
// raw site snapshots, normalized power flow and per-device records.

pub mod connection;
pub mod device;
pub mod power_flow;
pub mod snapshot;

pub use connection::{ConnectionId, ConnectionState};
pub use device::{DeviceIdentity, DeviceRecord, HistorySample, TrackedDevice};
pub use power_flow::{
    ChargingState, FlowEdge, FlowNode, FlowNodeKind, PowerFlowReading, PowerUnit,
};
pub use snapshot::SiteSnapshot;
