//! Application configuration layered from defaults, a JSON file and the environment.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::catalog::SortKey;

/// Directory under the platform config dir holding `config.json`.
pub const CONFIG_DIR: &str = "modcat";
/// Name of the configuration file.
pub const CONFIG_FILE: &str = "config.json";
/// Prefix for environment overrides, e.g. `MODCAT_GITHUB_TOKEN`.
pub const ENV_PREFIX: &str = "MODCAT";

const MANIFEST_ROOT: &str =
    "https://raw.githubusercontent.com/BrandenEK/Blasphemous-Mod-Installer/main/remote-data";

/// One tracked category of mods, each with its own catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Stable identifier used on the command line.
    pub id: String,
    /// Human readable title.
    pub title: String,
    /// Cache file name, relative to the data root.
    pub cache_file: String,
    /// Location of the remote manifest.
    pub manifest_url: String,
    /// Selected display order.
    #[serde(default)]
    pub sort_key: SortKey,
}

impl CategoryConfig {
    fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            cache_file: format!("{id}.json"),
            manifest_url: format!("{MANIFEST_ROOT}/{id}.json"),
            sort_key: SortKey::default(),
        }
    }
}

/// Repository publishing the installer's own releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSource {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding catalog caches and logs.
    pub data_root: PathBuf,
    /// Token used to authenticate release lookups.
    pub github_token: Option<String>,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Category opened last.
    pub last_category: Option<String>,
    /// Enables debug logging.
    pub debug: bool,
    /// Tracked categories.
    pub categories: Vec<CategoryConfig>,
    /// Installer release feed.
    pub installer: ReleaseSource,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_root: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(CONFIG_DIR),
            github_token: None,
            user_agent: format!("modcat/{}", env!("CARGO_PKG_VERSION")),
            last_category: None,
            debug: false,
            categories: vec![
                CategoryConfig::new("blas1-mods", "Blasphemous mods"),
                CategoryConfig::new("blas1-skins", "Blasphemous skins"),
                CategoryConfig::new("blas2-mods", "Blasphemous II mods"),
            ],
            installer: ReleaseSource {
                owner: "BrandenEK".to_string(),
                repo: "Blasphemous-Mod-Installer".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load from the default location, applying environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from `path`, applying environment overrides. A missing file yields defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Json).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Persist to `path`, creating parent directories if needed.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory {}", parent.display()))?;
        }

        let serialized =
            serde_json::to_string_pretty(self).context("failed to serialize configuration")?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write config {}", path.display()))
    }

    /// Category with the given identifier.
    pub fn category(&self, id: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|category| category.id == id)
    }

    /// Mutable access to a category, e.g. to remember its sort key.
    pub fn category_mut(&mut self, id: &str) -> Option<&mut CategoryConfig> {
        self.categories.iter_mut().find(|category| category.id == id)
    }

    /// Cache file for `category`.
    pub fn cache_path(&self, category: &CategoryConfig) -> PathBuf {
        self.data_root.join(&category.cache_file)
    }

    /// Directory for log files.
    pub fn log_dir(&self) -> PathBuf {
        self.data_root.join("logs")
    }
}

/// Default configuration file location.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write a default configuration file when none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    if !path.exists() {
        AppConfig::default().persist(&path)?;
    }
    Ok(path)
}
