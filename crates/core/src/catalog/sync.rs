use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::{
    sync::mpsc,
    task::{self, JoinError, JoinHandle},
};
use tracing::{debug, info, warn};

use super::{sort_records, Catalog, SortKey};
use crate::{
    models::{CatalogRecord, ReleaseInfo, RemoteModIdentity},
    remote::{ManifestSource, ReleaseLookup, RemoteError},
    store::{CatalogStore, StoreError},
    version::VersionTriple,
};

/// Reasons a remote pass finished without replacing the catalog.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The manifest could not be fetched or decoded.
    #[error("failed to fetch manifest: {0}")]
    Manifest(#[source] RemoteError),
    /// A release lookup failed, aborting the whole pass.
    #[error("no release for {name}: {source}")]
    ReleaseUnavailable {
        /// Mod whose lookup failed.
        name: String,
        /// Underlying error.
        source: RemoteError,
    },
    /// The refreshed catalog could not be written to the local cache.
    #[error(transparent)]
    Persist(#[from] StoreError),
    /// The background cache write did not complete.
    #[error("cache write task failed: {0}")]
    Background(#[from] JoinError),
    /// Another pass is already running for this catalog.
    #[error("a synchronisation is already in progress")]
    AlreadyRunning,
}

/// Events emitted by the async catalog synchroniser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The catalog was replaced with fresh remote data.
    Replaced {
        /// Category that was refreshed.
        category: String,
        /// Number of records in the new catalog.
        count: usize,
    },
    /// The remote pass stopped and the catalog was left as it was.
    Aborted {
        /// Category that failed to refresh.
        category: String,
        /// Why the pass stopped.
        reason: String,
    },
}

/// Keeps one category's catalog in step with its remote manifest.
pub struct CatalogSynchronizer {
    category: String,
    manifest_url: String,
    store: CatalogStore,
    manifest: Arc<dyn ManifestSource>,
    releases: Arc<dyn ReleaseLookup>,
    catalog: Catalog,
    sort_key: RwLock<SortKey>,
    loaded: AtomicBool,
    in_flight: AtomicBool,
    events: Option<mpsc::Sender<SyncEvent>>,
}

impl CatalogSynchronizer {
    /// Create a synchroniser with an empty catalog.
    pub fn new(
        category: impl Into<String>,
        manifest_url: impl Into<String>,
        store: CatalogStore,
        manifest: Arc<dyn ManifestSource>,
        releases: Arc<dyn ReleaseLookup>,
    ) -> Self {
        Self {
            category: category.into(),
            manifest_url: manifest_url.into(),
            store,
            manifest,
            releases,
            catalog: Catalog::default(),
            sort_key: RwLock::new(SortKey::default()),
            loaded: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            events: None,
        }
    }

    /// Publish into an existing catalog handle instead of a fresh one.
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Initial display order.
    pub fn with_sort_key(self, key: SortKey) -> Self {
        *self.sort_key.write() = key;
        self
    }

    /// Forward the outcome of every background pass to `sender`.
    pub fn with_events(mut self, sender: mpsc::Sender<SyncEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Category identifier.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Handle to the catalog this synchroniser publishes into.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Currently selected display order.
    pub fn sort_key(&self) -> SortKey {
        *self.sort_key.read()
    }

    /// Select a new display order and re-sort the catalog.
    pub fn sort(&self, key: SortKey) {
        *self.sort_key.write() = key;
        self.catalog.sort(key);
    }

    /// Load the local cache, then refresh from the remote manifest in the background.
    ///
    /// Only the first call in a session does anything; later calls return `None`.
    pub fn load_all(self: &Arc<Self>) -> Option<JoinHandle<SyncEvent>> {
        if self.loaded.swap(true, Ordering::SeqCst) {
            debug!(category = %self.category, "catalog already loaded");
            return None;
        }

        self.load_local();
        Some(self.refresh())
    }

    /// Start a background remote pass, regardless of whether one ran before.
    pub fn refresh(self: &Arc<Self>) -> JoinHandle<SyncEvent> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let event = match this.sync_remote().await {
                Ok(count) => SyncEvent::Replaced {
                    category: this.category.clone(),
                    count,
                },
                Err(err) => {
                    warn!(category = %this.category, "Remote sync aborted: {err}");
                    SyncEvent::Aborted {
                        category: this.category.clone(),
                        reason: err.to_string(),
                    }
                }
            };

            if let Some(sender) = &this.events {
                if sender.send(event.clone()).await.is_err() {
                    debug!(category = %this.category, "sync event receiver dropped");
                }
            }
            event
        })
    }

    /// Replace the catalog with the local cache. Never touches the network.
    pub fn load_local(&self) -> usize {
        let mut records = self.store.load();
        let count = records.len();
        info!(category = %self.category, count, "Loaded {count} local mods");
        sort_records(&mut records, self.sort_key());
        self.catalog.replace(records);
        count
    }

    /// Run one remote pass and return the size of the new catalog.
    ///
    /// The catalog is only replaced when the manifest and every release lookup
    /// succeed and the result has been written to the local cache.
    pub async fn sync_remote(&self) -> Result<usize, SyncError> {
        let _guard = InFlight::acquire(&self.in_flight).ok_or(SyncError::AlreadyRunning)?;

        let identities = self
            .manifest
            .fetch(&self.manifest_url)
            .await
            .map_err(SyncError::Manifest)?;

        let mut seen = HashSet::new();
        let mut fetched = Vec::with_capacity(identities.len());
        for identity in identities {
            if !seen.insert(identity.name.clone()) {
                warn!(category = %self.category, mod_name = %identity.name, "Skipping duplicate manifest entry");
                continue;
            }

            info!(category = %self.category, mod_name = %identity.name, "Getting latest release for {}", identity.name);
            let release = self
                .releases
                .fetch_latest(&identity.github_author, &identity.github_repo)
                .await
                .map_err(|source| SyncError::ReleaseUnavailable {
                    name: identity.name.clone(),
                    source,
                })?;
            fetched.push((identity, release));
        }

        let prior = self.catalog.snapshot();
        let mut replacement: Vec<CatalogRecord> = fetched
            .into_iter()
            .map(|(identity, release)| {
                let prior = prior.iter().find(|record| record.name == identity.name);
                merge_record(identity, &release, prior)
            })
            .collect();
        self.persist(replacement.clone()).await?;

        let sort_key = self.sort_key();
        let (count, drifted) = self.catalog.publish_with(
            |current: &[CatalogRecord]| -> Result<(Vec<CatalogRecord>, (usize, bool)), SyncError> {
                let drifted = carry_install_state(&mut replacement, current);
                let mut published = replacement.clone();
                sort_records(&mut published, sort_key);
                Ok((published, (replacement.len(), drifted)))
            },
        )?;

        if drifted {
            debug!(category = %self.category, "install state changed during sync, rewriting cache");
            if let Err(err) = self.persist(replacement).await {
                warn!(category = %self.category, "Failed to rewrite local catalog: {err}");
            }
        }

        info!(category = %self.category, count, "Loaded {count} global mods");
        Ok(count)
    }

    async fn persist(&self, records: Vec<CatalogRecord>) -> Result<(), SyncError> {
        let store = self.store.clone();
        task::spawn_blocking(move || store.save(&records)).await??;
        Ok(())
    }
}

/// Copy `installed`/`enabled` from `current` onto matching records.
///
/// Returns whether anything changed.
fn carry_install_state(records: &mut [CatalogRecord], current: &[CatalogRecord]) -> bool {
    let mut changed = false;
    for record in records.iter_mut() {
        let Some(live) = current.iter().find(|live| live.name == record.name) else {
            continue;
        };
        if (live.installed, live.enabled) != (record.installed, record.enabled) {
            record.installed = live.installed;
            record.enabled = live.enabled;
            changed = true;
        }
    }
    changed
}

/// Combine fresh remote data with the local-only state of an existing record.
///
/// Only `installed` and `enabled` survive from `prior`; everything else comes
/// from the manifest entry and its latest release. The first release date is
/// kept from `prior` when the manifest does not declare one.
pub fn merge_record(
    identity: RemoteModIdentity,
    release: &ReleaseInfo,
    prior: Option<&CatalogRecord>,
) -> CatalogRecord {
    let unset = DateTime::<Utc>::default();
    let initial_release_date = identity
        .initial_release_date
        .or_else(|| {
            prior
                .map(|record| record.initial_release_date)
                .filter(|date| *date != unset)
        })
        .unwrap_or(release.published_at);

    CatalogRecord {
        name: identity.name,
        author: identity.author,
        description: identity.description,
        github_author: identity.github_author,
        github_repo: identity.github_repo,
        required_dlls: identity.required_dlls,
        dependency_names: identity.dependency_names,
        latest_version: VersionTriple::parse(&release.tag_name),
        download_url: release.first_asset_url.clone(),
        latest_release_date: release.published_at,
        initial_release_date,
        installed: prior.map_or(false, |record| record.installed),
        enabled: prior.map_or(false, |record| record.enabled),
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
