// ── In-memory stores ──

mod snapshot_cache;

pub use snapshot_cache::SnapshotCache;
