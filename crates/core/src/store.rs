//! Local catalog cache persisted alongside the installer data.

use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;
use tracing::warn;

use crate::models::CatalogRecord;

/// Failures while reading or writing local files.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading the file failed for a reason other than absence.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// Writing the file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// Records could not be serialised.
    #[error("failed to serialize catalog for {path}: {source}")]
    Serialize {
        /// Destination file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Text storage the catalog cache is written through.
pub trait Persistence: Send + Sync {
    /// Read the whole file, returning `None` when it does not exist.
    fn read_text(&self, path: &Path) -> Result<Option<String>, StoreError>;
    /// Replace the file contents.
    fn write_text(&self, path: &Path, contents: &str) -> Result<(), StoreError>;
}

/// [`Persistence`] backed by the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsPersistence;

impl Persistence for FsPersistence {
    fn read_text(&self, path: &Path) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, contents).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Loads and saves one category's catalog as an ordered JSON array.
#[derive(Clone)]
pub struct CatalogStore {
    path: PathBuf,
    persistence: Arc<dyn Persistence>,
}

impl CatalogStore {
    /// Store backed by the filesystem at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_persistence(path, Arc::new(FsPersistence))
    }

    /// Store writing through a custom persistence backend.
    pub fn with_persistence(path: impl Into<PathBuf>, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            path: path.into(),
            persistence,
        }
    }

    /// Location of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load cached records. A missing, unreadable or malformed cache is an empty catalog.
    pub fn load(&self) -> Vec<CatalogRecord> {
        let contents = match self.persistence.read_text(&self.path) {
            Ok(Some(contents)) => contents,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!("Ignoring local catalog: {err}");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<CatalogRecord>>(&contents) {
            Ok(records) => {
                let mut seen = HashSet::new();
                records
                    .into_iter()
                    .filter(|record| {
                        let first = seen.insert(record.name.clone());
                        if !first {
                            warn!(mod_name = %record.name, "Skipping duplicate cached record");
                        }
                        first
                    })
                    .collect()
            }
            Err(err) => {
                warn!(
                    "Ignoring malformed local catalog {}: {err}",
                    self.path.display()
                );
                Vec::new()
            }
        }
    }

    /// Overwrite the cache with `records`, in the given order.
    pub fn save(&self, records: &[CatalogRecord]) -> Result<(), StoreError> {
        let serialized =
            serde_json::to_string_pretty(records).map_err(|source| StoreError::Serialize {
                path: self.path.clone(),
                source,
            })?;
        self.persistence.write_text(&self.path, &serialized)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::version::VersionTriple;
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use tempfile::tempdir;

    type WriteHook = Box<dyn FnOnce() + Send>;

    /// In-memory persistence that can be told to fail writes.
    #[derive(Default)]
    pub(crate) struct MemoryPersistence {
        pub files: Mutex<HashMap<PathBuf, String>>,
        pub fail_writes: Mutex<bool>,
        /// Runs once, right before the next write lands.
        pub before_write: Mutex<Option<WriteHook>>,
    }

    impl Persistence for MemoryPersistence {
        fn read_text(&self, path: &Path) -> Result<Option<String>, StoreError> {
            Ok(self.files.lock().get(path).cloned())
        }

        fn write_text(&self, path: &Path, contents: &str) -> Result<(), StoreError> {
            let hook = self.before_write.lock().take();
            if let Some(hook) = hook {
                hook();
            }
            if *self.fail_writes.lock() {
                return Err(StoreError::Write {
                    path: path.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            self.files
                .lock()
                .insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }
    }

    fn sample_record() -> CatalogRecord {
        CatalogRecord {
            name: "Modding API".to_string(),
            author: "Damocles".to_string(),
            description: "Shared framework".to_string(),
            github_author: "BrandenEK".to_string(),
            github_repo: "Blasphemous-Modding-API".to_string(),
            required_dlls: ["ModdingAPI.dll".to_string()].into(),
            dependency_names: ["Framework".to_string()].into(),
            latest_version: VersionTriple::new(1, 4, 2),
            download_url: "https://example.com/api.zip".to_string(),
            latest_release_date: Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap(),
            initial_release_date: Utc.with_ymd_and_hms(2022, 1, 9, 8, 30, 0).unwrap(),
            installed: true,
            enabled: false,
        }
    }

    #[test]
    fn missing_cache_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = CatalogStore::new(dir.path().join("mods.json"));
        assert!(store.load().is_empty());
        Ok(())
    }

    #[test]
    fn save_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = CatalogStore::new(dir.path().join("nested/mods.json"));
        let records = vec![sample_record(), CatalogRecord::default()];

        store.save(&records)?;
        assert!(store.path().exists());
        assert_eq!(store.load(), records);
        Ok(())
    }

    #[test]
    fn malformed_cache_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mods.json");
        fs::write(&path, "{ not json")?;
        assert!(CatalogStore::new(&path).load().is_empty());
        Ok(())
    }

    #[test]
    fn older_files_default_missing_fields() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mods.json");
        fs::write(
            &path,
            r#"[{"name":"Randomizer","author":"Damocles","githubAuthor":"BrandenEK","githubRepo":"Blasphemous-Randomizer","latestVersion":"v2.1.0"}]"#,
        )?;

        let records = CatalogStore::new(&path).load();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.latest_version, VersionTriple::new(2, 1, 0));
        assert!(record.required_dlls.is_empty());
        assert!(record.dependency_names.is_empty());
        assert_eq!(record.initial_release_date, chrono::DateTime::<Utc>::default());
        assert!(!record.installed);
        assert!(!record.enabled);
        Ok(())
    }

    #[test]
    fn null_fields_keep_the_record() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mods.json");
        fs::write(
            &path,
            r#"[{"name":"Framework","author":"Damocles","description":null,"githubAuthor":"BrandenEK","githubRepo":"Blasphemous-Framework","requiredDlls":null,"dependencies":null,"latestVersion":"1.2.0","installed":true,"enabled":true}]"#,
        )?;

        let records = CatalogStore::new(&path).load();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(record.installed && record.enabled);
        assert!(record.description.is_empty());
        assert!(record.required_dlls.is_empty());
        assert!(record.dependency_names.is_empty());
        assert_eq!(record.latest_version, VersionTriple::new(1, 2, 0));
        Ok(())
    }

    #[test]
    fn duplicate_names_keep_first_record() -> Result<()> {
        let dir = tempdir()?;
        let store = CatalogStore::new(dir.path().join("mods.json"));
        let first = sample_record();
        let mut second = sample_record();
        second.installed = false;
        second.author = "Someone else".to_string();
        store.save(&[first.clone(), second, CatalogRecord::default()])?;

        let records = store.load();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], first);
        assert_eq!(records[1].name, "");
        Ok(())
    }

    #[test]
    fn write_failure_propagates() {
        let persistence = Arc::new(MemoryPersistence::default());
        *persistence.fail_writes.lock() = true;
        let store = CatalogStore::with_persistence("mods.json", persistence);
        let err = store.save(&[sample_record()]).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
    }
}
