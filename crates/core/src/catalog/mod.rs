//! Catalog state, dependency resolution and synchronisation.

/// Dependency queries over a catalog snapshot.
pub mod resolver;
/// Display ordering.
pub mod sort;
/// Local cache plus remote manifest synchronisation.
pub mod sync;

use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use crate::models::CatalogRecord;

pub use resolver::DependencyResolver;
pub use sort::{sort_records, SortKey};
pub use sync::{merge_record, CatalogSynchronizer, SyncError, SyncEvent};

/// Thread-safe handle to one category's records.
///
/// Readers get an immutable snapshot; every change publishes a new one, so a
/// reader never observes a half-applied update.
#[derive(Clone, Default)]
pub struct Catalog {
    inner: Arc<RwLock<Arc<Vec<CatalogRecord>>>>,
}

impl Catalog {
    /// Build a catalog holding `records`.
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(records))),
        }
    }

    /// Current records.
    pub fn snapshot(&self) -> Arc<Vec<CatalogRecord>> {
        self.inner.read().clone()
    }

    /// Swap in a new set of records.
    pub fn replace(&self, records: Vec<CatalogRecord>) {
        *self.inner.write() = Arc::new(records);
    }

    /// Build the next set of records from the current one and publish it.
    ///
    /// Readers keep seeing the current snapshot while `build` runs; other
    /// writers wait, so no state change made in between is lost. Nothing is
    /// published when `build` fails.
    pub fn publish_with<T, E>(
        &self,
        build: impl FnOnce(&[CatalogRecord]) -> Result<(Vec<CatalogRecord>, T), E>,
    ) -> Result<T, E> {
        let guard = self.inner.upgradable_read();
        let (records, output) = build(guard.as_slice())?;
        *RwLockUpgradableReadGuard::upgrade(guard) = Arc::new(records);
        Ok(output)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the catalog has no records.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Copy of the record called `name`.
    pub fn find(&self, name: &str) -> Option<CatalogRecord> {
        self.inner
            .read()
            .iter()
            .find(|record| record.name == name)
            .cloned()
    }

    /// Reorder the records for display.
    pub fn sort(&self, key: SortKey) {
        let mut guard = self.inner.write();
        let mut records = guard.as_ref().clone();
        sort_records(&mut records, key);
        *guard = Arc::new(records);
    }

    /// Record the outcome of an install/uninstall/enable/disable action.
    ///
    /// Returns `false` when no record is called `name`.
    pub fn set_install_state(&self, name: &str, installed: bool, enabled: bool) -> bool {
        let mut guard = self.inner.write();
        let Some(index) = guard.iter().position(|record| record.name == name) else {
            return false;
        };
        let mut records = guard.as_ref().clone();
        records[index].installed = installed;
        records[index].enabled = enabled;
        *guard = Arc::new(records);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> CatalogRecord {
        CatalogRecord {
            name: name.to_string(),
            ..CatalogRecord::default()
        }
    }

    #[test]
    fn snapshots_are_not_mutated_by_later_changes() {
        let catalog = Catalog::new(vec![record("b"), record("a")]);
        let before = catalog.snapshot();

        assert!(catalog.set_install_state("a", true, true));
        catalog.sort(SortKey::Name);

        assert_eq!(before[1].name, "a");
        assert!(!before[1].installed);

        let after = catalog.snapshot();
        assert_eq!(after[0].name, "a");
        assert!(after[0].installed && after[0].enabled);
    }

    #[test]
    fn unknown_names_are_reported() {
        let catalog = Catalog::new(vec![record("a")]);
        assert!(!catalog.set_install_state("missing", true, false));
        assert!(catalog.find("missing").is_none());
        assert_eq!(catalog.len(), 1);

        catalog.replace(Vec::new());
        assert!(catalog.is_empty());
    }
}
