// ── Latest-snapshot-per-site cache ──
//
// Concurrent storage keyed by site id. Each connection task commits its
// own sites, so writers never contend on the same key.

use std::sync::Arc;

use dashmap::DashMap;

use solarflow_api::models::SiteId;

use crate::model::SiteSnapshot;

/// Holds the most recent successful snapshot of every site.
///
/// Commits replace the previous snapshot wholesale; a site whose cycle
/// failed simply keeps its older entry.
#[derive(Default)]
pub struct SnapshotCache {
    by_site: DashMap<SiteId, Arc<SiteSnapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `snapshot`, replacing any previous one for the same site.
    /// Returns `true` if the site was new.
    pub fn commit(&self, snapshot: SiteSnapshot) -> bool {
        self.by_site
            .insert(snapshot.site_id, Arc::new(snapshot))
            .is_none()
    }

    pub fn get(&self, site_id: SiteId) -> Option<Arc<SiteSnapshot>> {
        self.by_site.get(&site_id).map(|r| Arc::clone(r.value()))
    }

    /// Every cached snapshot, ordered by site id.
    pub fn snapshot(&self) -> Vec<Arc<SiteSnapshot>> {
        let mut all: Vec<Arc<SiteSnapshot>> =
            self.by_site.iter().map(|r| Arc::clone(r.value())).collect();
        all.sort_by_key(|s| s.site_id);
        all
    }

    pub fn clear(&self) {
        self.by_site.clear();
    }

    pub fn len(&self) -> usize {
        self.by_site.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_site.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::model::ConnectionId;
    use solarflow_api::models::{Inventory, Site, SiteCurrentPowerFlow};

    fn snap(site_id: SiteId, conn: &str, name: &str) -> SiteSnapshot {
        SiteSnapshot {
            site_id,
            connection_id: ConnectionId::new(conn),
            site: Site {
                id: site_id,
                name: name.into(),
                peak_power: None,
                installation_date: None,
                status: None,
                location: None,
                extra: serde_json::Map::new(),
            },
            inventory: Inventory::default(),
            power_flow: SiteCurrentPowerFlow::default(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn commit_reports_new_sites() {
        let cache = SnapshotCache::new();
        assert!(cache.commit(snap(1, "home", "a")));
        assert!(!cache.commit(snap(1, "home", "b")));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(1).unwrap().site.name, "b");
    }

    #[test]
    fn snapshot_is_ordered_by_site() {
        let cache = SnapshotCache::new();
        cache.commit(snap(30, "home", "c"));
        cache.commit(snap(10, "home", "a"));
        cache.commit(snap(20, "cabin", "b"));

        let ids: Vec<SiteId> = cache.snapshot().iter().map(|s| s.site_id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn clear_empties_everything() {
        let cache = SnapshotCache::new();
        cache.commit(snap(1, "home", "a"));
        cache.commit(snap(2, "home", "b"));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.snapshot().is_empty());
    }
}
