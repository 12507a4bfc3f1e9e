//! Memoized view pairs keyed by selection

use std::sync::Arc;

use canopy::prelude::{Selection, ViewPair};
use dashmap::DashMap;
use tracing::debug;

/// Bounded cache of computed views. Flushed wholesale when full and discarded
/// with its generation on reload.
pub struct ViewCache {
    entries: DashMap<Selection, Arc<ViewPair>>,
    capacity: usize,
}

impl ViewCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, selection: &Selection) -> Option<Arc<ViewPair>> {
        self.entries.get(selection).map(|e| Arc::clone(e.value()))
    }

    pub fn insert(&self, selection: Selection, views: Arc<ViewPair>) {
        if self.capacity == 0 {
            return;
        }
        if self.len() >= self.capacity {
            debug!("View cache full ({} entries), flushing", self.len());
            self.entries.clear();
        }
        self.entries.insert(selection, views);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy::prelude::{Dataset, FilterSpec, compute_views};

    fn views() -> Arc<ViewPair> {
        let ds = Dataset::with_measures(["m"], vec![]);
        Arc::new(compute_views(&ds, &FilterSpec::all(), "age_plan", "m", "m").unwrap())
    }

    #[test]
    fn flushes_when_full() {
        let cache = ViewCache::new(2);
        cache.insert(Selection::new("age_plan", "a", "b"), views());
        cache.insert(Selection::new("age_plan", "a", "c"), views());
        assert_eq!(cache.len(), 2);
        cache.insert(Selection::new("age_plan", "a", "d"), views());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&Selection::new("age_plan", "a", "d")).is_some());
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let cache = ViewCache::new(0);
        cache.insert(Selection::new("age_plan", "a", "b"), views());
        assert_eq!(cache.len(), 0);
    }
}
