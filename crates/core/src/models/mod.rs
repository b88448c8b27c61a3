//! Shared domain models.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::version::VersionTriple;

/// One mod tracked in a category catalog.
///
/// Everything except `installed`/`enabled` is refreshed from the remote
/// manifest and release feed on every synchronisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogRecord {
    /// Unique name within the catalog.
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Credited author.
    #[serde(deserialize_with = "null_as_default")]
    pub author: String,
    /// Free-form description shown next to the mod.
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    /// Owner of the repository publishing releases.
    #[serde(deserialize_with = "null_as_default")]
    pub github_author: String,
    /// Repository publishing releases.
    #[serde(deserialize_with = "null_as_default")]
    pub github_repo: String,
    /// Shared libraries this mod ships and expects other installed mods to share.
    #[serde(deserialize_with = "null_as_default")]
    pub required_dlls: BTreeSet<String>,
    /// Names of mods that must be enabled for this one to work.
    #[serde(rename = "dependencies", deserialize_with = "null_as_default")]
    pub dependency_names: BTreeSet<String>,
    /// Latest published version.
    #[serde(deserialize_with = "null_as_default")]
    pub latest_version: VersionTriple,
    /// Download location of the latest release artifact.
    #[serde(deserialize_with = "null_as_default")]
    pub download_url: String,
    /// Publish time of the latest release.
    pub latest_release_date: DateTime<Utc>,
    /// Publish time of the first release seen for this mod.
    pub initial_release_date: DateTime<Utc>,
    /// Whether the mod is present on disk.
    pub installed: bool,
    /// Whether the mod is active.
    pub enabled: bool,
}

impl CatalogRecord {
    /// Whether this mod declares the shared library `dll`.
    pub fn requires_dll(&self, dll: &str) -> bool {
        self.required_dlls.contains(dll)
    }

    /// Whether this mod depends on the mod called `name`.
    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependency_names.contains(name)
    }

    /// Returns a user-facing label combining name and version.
    pub fn display_name(&self) -> String {
        format!("{} v{}", self.name, self.latest_version)
    }
}

/// A manifest entry: identity and relations, without release data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteModIdentity {
    /// Unique name within the catalog.
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Credited author.
    #[serde(deserialize_with = "null_as_default")]
    pub author: String,
    /// Free-form description shown next to the mod.
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    /// Owner of the repository publishing releases.
    #[serde(deserialize_with = "null_as_default")]
    pub github_author: String,
    /// Repository publishing releases.
    #[serde(deserialize_with = "null_as_default")]
    pub github_repo: String,
    /// Shared libraries the mod declares.
    #[serde(deserialize_with = "null_as_default")]
    pub required_dlls: BTreeSet<String>,
    /// Names of mods this one depends on.
    #[serde(rename = "dependencies", deserialize_with = "null_as_default")]
    pub dependency_names: BTreeSet<String>,
    /// First release date, when the manifest tracks it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_release_date: Option<DateTime<Utc>>,
}

/// Latest release of a repository, as reported by the release feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// Raw tag, e.g. `v1.2.0`.
    pub tag_name: String,
    /// Download location of the first attached asset.
    pub first_asset_url: String,
    /// Release page for humans.
    pub html_url: String,
    /// Publish timestamp.
    pub published_at: DateTime<Utc>,
}

/// Treat an explicit `null` like a missing key. Older caches and manifests
/// write `null` for empty lists and unset strings.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
