//! Process-wide incident index handle
//!
//! Requests read the current index through a cheap `Arc` clone and never hold the lock while
//! routing. A reload builds the replacement index outside the lock and then swaps the handle,
//! so every reader sees either the old index in full or the new one in full. The old index is
//! freed once the last in-flight request drops its snapshot.

use crate::{IncidentPoint, SpatialIndex};
use std::sync::{Arc, PoisonError, RwLock};

/// A published, immutable version of the incident index
#[derive(Debug)]
pub struct IndexSnapshot {
    /// Monotonic version, starting at 0 for the initial index
    pub version: u64,
    pub index: SpatialIndex,
}

/// Shared handle to the current incident index
#[derive(Debug)]
pub struct SharedIndex {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl Default for SharedIndex {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SharedIndex {
    /// Create a handle publishing `index` as version 0
    pub fn new(index: SpatialIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(IndexSnapshot { version: 0, index })),
        }
    }

    /// Create a handle with an empty index (no incident data loaded yet)
    pub fn empty() -> Self {
        Self::new(SpatialIndex::empty())
    }

    /// The currently published snapshot
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        // The guarded value is a plain Arc, so a poisoned lock still holds a usable handle
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Version of the currently published snapshot
    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    /// Build a new index from `points` and publish it
    pub fn load(&self, points: Vec<IncidentPoint>) -> Arc<IndexSnapshot> {
        #[cfg(feature = "profiling")]
        profiling::scope!("shared::load");

        let index = SpatialIndex::build(points);
        self.publish(index)
    }

    /// Publish an already built index
    pub fn publish(&self, index: SpatialIndex) -> Arc<IndexSnapshot> {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let snapshot = Arc::new(IndexSnapshot {
            version: current.version + 1,
            index,
        });
        *current = snapshot.clone();
        drop(current);

        tracing::info!(
            "Published incident index v{} with {} points",
            snapshot.version,
            snapshot.index.len()
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_empty_handle() {
        let shared = SharedIndex::empty();
        assert_eq!(shared.version(), 0);
        assert!(shared.snapshot().index.is_empty());
    }

    #[test]
    fn test_reload_swaps_and_bumps_version() {
        let shared = SharedIndex::empty();
        let old = shared.snapshot();

        let published = shared.load(vec![IncidentPoint::new(1, 13.0, 80.2)]);
        assert_eq!(published.version, 1);
        assert_eq!(shared.version(), 1);
        assert_eq!(shared.snapshot().index.len(), 1);

        // A reader holding the previous snapshot still sees it in full
        assert!(old.index.is_empty());
        assert_eq!(old.version, 0);
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let shared = Arc::new(SharedIndex::empty());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = shared.snapshot();
                        // Version n always carries exactly n points
                        assert_eq!(snapshot.index.len() as u64, snapshot.version);
                    }
                })
            })
            .collect();

        for n in 1..=20 {
            let points = (0..n).map(|i| IncidentPoint::new(i, 13.0, 80.2)).collect();
            shared.load(points);
        }

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(shared.version(), 20);
    }
}
