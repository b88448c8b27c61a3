use std::collections::BTreeSet;

use crate::models::CatalogRecord;

use super::Catalog;

/// Advisory dependency queries over a catalog snapshot.
///
/// Every query reads a single snapshot, so answers are consistent even while a
/// synchronisation replaces the catalog.
#[derive(Clone)]
pub struct DependencyResolver {
    catalog: Catalog,
}

impl DependencyResolver {
    /// Resolver reading from `catalog`.
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Shared libraries `record` declares that no other installed mod also ships.
    pub fn unmet_shared_libraries(&self, record: &CatalogRecord) -> BTreeSet<String> {
        unmet_shared_libraries(&self.catalog.snapshot(), record)
    }

    /// Disabled mods that `record` depends on.
    pub fn required_enables(&self, record: &CatalogRecord) -> Vec<CatalogRecord> {
        required_enables(&self.catalog.snapshot(), record)
    }

    /// Enabled mods that depend on `record`.
    pub fn required_disables(&self, record: &CatalogRecord) -> Vec<CatalogRecord> {
        required_disables(&self.catalog.snapshot(), record)
    }
}

/// See [`DependencyResolver::unmet_shared_libraries`].
pub fn unmet_shared_libraries(records: &[CatalogRecord], record: &CatalogRecord) -> BTreeSet<String> {
    record
        .required_dlls
        .iter()
        .filter(|dll| {
            !records
                .iter()
                .any(|other| other.name != record.name && other.installed && other.requires_dll(dll))
        })
        .cloned()
        .collect()
}

/// See [`DependencyResolver::required_enables`].
pub fn required_enables(records: &[CatalogRecord], record: &CatalogRecord) -> Vec<CatalogRecord> {
    records
        .iter()
        .filter(|other| record.has_dependency(&other.name) && !other.enabled)
        .cloned()
        .collect()
}

/// See [`DependencyResolver::required_disables`].
pub fn required_disables(records: &[CatalogRecord], record: &CatalogRecord) -> Vec<CatalogRecord> {
    records
        .iter()
        .filter(|other| other.has_dependency(&record.name) && other.enabled)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, dlls: &[&str], deps: &[&str], installed: bool, enabled: bool) -> CatalogRecord {
        CatalogRecord {
            name: name.to_string(),
            required_dlls: dlls.iter().map(|dll| dll.to_string()).collect(),
            dependency_names: deps.iter().map(|dep| dep.to_string()).collect(),
            installed,
            enabled,
            ..CatalogRecord::default()
        }
    }

    fn names(records: &[CatalogRecord]) -> Vec<&str> {
        records.iter().map(|record| record.name.as_str()).collect()
    }

    #[test]
    fn shared_library_met_by_other_installed_mod() {
        let a = record("A", &["x"], &[], true, true);
        let catalog = Catalog::new(vec![a.clone(), record("B", &["x"], &[], true, false)]);
        let resolver = DependencyResolver::new(catalog.clone());
        assert!(resolver.unmet_shared_libraries(&a).is_empty());

        catalog.set_install_state("B", false, false);
        assert_eq!(
            resolver.unmet_shared_libraries(&a),
            BTreeSet::from(["x".to_string()])
        );

        catalog.replace(vec![a.clone()]);
        assert_eq!(
            resolver.unmet_shared_libraries(&a),
            BTreeSet::from(["x".to_string()])
        );
    }

    #[test]
    fn shared_library_ignores_the_mod_itself() {
        let a = record("A", &["x", "y"], &[], true, true);
        let others = vec![a.clone(), record("C", &["y"], &[], true, true)];
        assert_eq!(
            unmet_shared_libraries(&others, &a),
            BTreeSet::from(["x".to_string()])
        );
        assert!(unmet_shared_libraries(&others, &record("D", &[], &[], true, true)).is_empty());
    }

    #[test]
    fn required_enables_lists_disabled_dependencies() {
        let a = record("A", &[], &["B", "Missing"], true, false);
        let catalog = Catalog::new(vec![a.clone(), record("B", &[], &[], true, false)]);
        let resolver = DependencyResolver::new(catalog.clone());
        assert_eq!(names(&resolver.required_enables(&a)), ["B"]);

        catalog.set_install_state("B", true, true);
        assert!(resolver.required_enables(&a).is_empty());
    }

    #[test]
    fn required_disables_lists_enabled_dependents() {
        let b = record("B", &[], &[], true, true);
        let catalog = Catalog::new(vec![
            record("A", &[], &["B"], true, true),
            b.clone(),
            record("C", &[], &["B"], true, false),
        ]);
        let resolver = DependencyResolver::new(catalog.clone());
        assert_eq!(names(&resolver.required_disables(&b)), ["A"]);

        catalog.set_install_state("A", true, false);
        assert!(resolver.required_disables(&b).is_empty());
    }
}
