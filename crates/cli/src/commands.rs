use std::{path::Path, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use modcat_core::{
    config::{AppConfig, CategoryConfig},
    remote::{GithubReleases, HttpManifestSource, ManifestSource, ReleaseLookup},
    update::check_installer_update,
    CatalogRecord, CatalogStore, CatalogSynchronizer, DependencyResolver, SortKey, SyncEvent,
    VersionTriple,
};
use tracing::{error, info};

struct Remotes {
    manifest: Arc<dyn ManifestSource>,
    releases: Arc<dyn ReleaseLookup>,
}

impl Remotes {
    fn new(config: &AppConfig) -> Result<Self> {
        let manifest = HttpManifestSource::new(&config.user_agent)
            .context("failed to build manifest client")?;
        let releases = GithubReleases::new(&config.user_agent, config.github_token.clone())
            .context("failed to build release client")?;
        Ok(Self {
            manifest: Arc::new(manifest),
            releases: Arc::new(releases),
        })
    }
}

fn synchronizer(
    config: &AppConfig,
    category: &CategoryConfig,
    remotes: &Remotes,
) -> Arc<CatalogSynchronizer> {
    Arc::new(
        CatalogSynchronizer::new(
            category.id.clone(),
            category.manifest_url.clone(),
            CatalogStore::new(config.cache_path(category)),
            remotes.manifest.clone(),
            remotes.releases.clone(),
        )
        .with_sort_key(category.sort_key),
    )
}

fn resolve_category<'a>(config: &'a AppConfig, id: Option<&str>) -> Result<&'a CategoryConfig> {
    let id = id
        .or(config.last_category.as_deref())
        .or_else(|| config.categories.first().map(|category| category.id.as_str()))
        .ok_or_else(|| anyhow!("no categories configured"))?;
    config
        .category(id)
        .ok_or_else(|| anyhow!("unknown category `{id}`"))
}

fn find_record(sync: &CatalogSynchronizer, name: &str) -> Result<CatalogRecord> {
    sync.catalog()
        .find(name)
        .ok_or_else(|| anyhow!("no mod called `{name}` in {}", sync.category()))
}

pub async fn sync(config: &AppConfig, only: Option<&str>) -> Result<()> {
    let remotes = Remotes::new(config)?;
    let categories: Vec<&CategoryConfig> = match only {
        Some(id) => vec![config
            .category(id)
            .ok_or_else(|| anyhow!("unknown category `{id}`"))?],
        None => config.categories.iter().collect(),
    };

    let mut handles = Vec::new();
    for category in categories {
        let sync = synchronizer(config, category, &remotes);
        if let Some(handle) = sync.load_all() {
            handles.push(handle);
        }
    }

    let mut failed = 0;
    for handle in handles {
        match handle.await.context("sync task panicked")? {
            SyncEvent::Replaced { category, count } => {
                println!("{category}: {count} mods");
            }
            SyncEvent::Aborted { category, reason } => {
                error!(category = %category, "Sync failed: {reason}");
                println!("{category}: kept cached catalog ({reason})");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        info!(failed, "Some catalogs were not refreshed");
    }
    Ok(())
}

pub fn list(
    config: &mut AppConfig,
    config_path: &Path,
    category: Option<&str>,
    sort: Option<SortKey>,
) -> Result<()> {
    let category = resolve_category(config, category)?.clone();
    let sync = synchronizer(config, &category, &Remotes::new(config)?);
    sync.load_local();

    if let Some(key) = sort {
        sync.sort(key);
    }

    config.last_category = Some(category.id.clone());
    if let Some(entry) = config.category_mut(&category.id) {
        entry.sort_key = sync.sort_key();
    }
    config.persist(config_path)?;

    println!("{} ({} mods, by {})", category.title, sync.catalog().len(), sync.sort_key());
    for record in sync.catalog().snapshot().iter() {
        let state = match (record.installed, record.enabled) {
            (true, true) => "enabled",
            (true, false) => "disabled",
            (false, _) => "-",
        };
        println!(
            "  {:<32} {:<20} {:>10}  {:<8} {}",
            record.name,
            record.author,
            record.latest_version.to_string(),
            state,
            record.latest_release_date.format("%Y-%m-%d")
        );
    }
    Ok(())
}

pub fn deps(config: &AppConfig, category: &str, name: &str) -> Result<()> {
    let category = resolve_category(config, Some(category))?;
    let sync = synchronizer(config, category, &Remotes::new(config)?);
    sync.load_local();
    let record = find_record(&sync, name)?;
    let resolver = DependencyResolver::new(sync.catalog().clone());

    let dlls = resolver.unmet_shared_libraries(&record);
    let enables = resolver.required_enables(&record);
    let disables = resolver.required_disables(&record);

    println!("{}", record.display_name());
    print_list("Shared libraries no other installed mod provides", dlls.iter().cloned());
    print_list(
        "Must be enabled first",
        enables.iter().map(|record| record.name.clone()),
    );
    print_list(
        "Must be disabled first",
        disables.iter().map(|record| record.name.clone()),
    );

    let missing: Vec<_> = record
        .dependency_names
        .iter()
        .filter(|dependency| sync.catalog().find(dependency).is_none())
        .cloned()
        .collect();
    print_list("Dependencies not in this catalog", missing.into_iter());
    Ok(())
}

fn print_list(title: &str, items: impl Iterator<Item = String>) {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        println!("  {title}: none");
    } else {
        println!("  {title}: {}", items.join(", "));
    }
}

pub fn mark(
    config: &AppConfig,
    category: &str,
    name: &str,
    installed: Option<bool>,
    enabled: Option<bool>,
) -> Result<()> {
    let category = resolve_category(config, Some(category))?;
    let store = CatalogStore::new(config.cache_path(category));
    let sync = synchronizer(config, category, &Remotes::new(config)?);
    sync.load_local();

    let record = find_record(&sync, name)?;
    let (installed, enabled) = next_install_state(&record, installed, enabled)?;
    if enabled && !record.enabled {
        let resolver = DependencyResolver::new(sync.catalog().clone());
        let pending = resolver.required_enables(&record);
        if !pending.is_empty() {
            let names: Vec<_> = pending.iter().map(|record| record.name.as_str()).collect();
            bail!("enable {} first", names.join(", "));
        }
    }
    if !enabled && record.enabled {
        let resolver = DependencyResolver::new(sync.catalog().clone());
        let dependents = resolver.required_disables(&record);
        if !dependents.is_empty() {
            let names: Vec<_> = dependents.iter().map(|record| record.name.as_str()).collect();
            bail!("disable {} first", names.join(", "));
        }
    }

    sync.catalog().set_install_state(name, installed, enabled);
    store.save(&sync.catalog().snapshot())?;
    info!(category = %category.id, mod_name = name, installed, enabled, "Recorded install state");
    Ok(())
}

/// Requested flags applied over the record's current ones. Uninstalling also disables.
fn next_install_state(
    record: &CatalogRecord,
    installed: Option<bool>,
    enabled: Option<bool>,
) -> Result<(bool, bool)> {
    let installed = installed.unwrap_or(record.installed);
    if enabled == Some(true) && !installed {
        bail!("install {} first", record.name);
    }
    Ok((installed, enabled.unwrap_or(record.enabled) && installed))
}

pub async fn check_update(config: &AppConfig) -> Result<()> {
    let releases = GithubReleases::new(&config.user_agent, config.github_token.clone())?;
    let current = VersionTriple::parse(env!("CARGO_PKG_VERSION"));
    match check_installer_update(
        &releases,
        &config.installer.owner,
        &config.installer.repo,
        current,
    )
    .await?
    {
        Some(update) => println!("modcat {} is available: {}", update.version, update.page_url),
        None => println!("modcat {current} is up to date"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(installed: bool, enabled: bool) -> CatalogRecord {
        CatalogRecord {
            name: "Framework".to_string(),
            installed,
            enabled,
            ..CatalogRecord::default()
        }
    }

    #[test]
    fn enabling_uninstalled_mod_is_refused() {
        let err = next_install_state(&record(false, false), None, Some(true)).unwrap_err();
        assert_eq!(err.to_string(), "install Framework first");

        let err = next_install_state(&record(true, true), Some(false), Some(true)).unwrap_err();
        assert_eq!(err.to_string(), "install Framework first");
    }

    #[test]
    fn install_flags_apply_over_current_state() -> Result<()> {
        assert_eq!(next_install_state(&record(false, false), Some(true), Some(true))?, (true, true));
        assert_eq!(next_install_state(&record(true, false), None, Some(true))?, (true, true));
        assert_eq!(next_install_state(&record(true, true), Some(false), None)?, (false, false));
        assert_eq!(next_install_state(&record(true, true), None, None)?, (true, true));
        Ok(())
    }
}
