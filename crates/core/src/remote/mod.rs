//! Remote collaborators: the category manifest and the release feed.

/// GitHub-backed release lookups.
pub mod github;
/// HTTP manifest download.
pub mod manifest;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ReleaseInfo, RemoteModIdentity};

pub use github::GithubReleases;
pub use manifest::HttpManifestSource;

/// Failures talking to remote collaborators.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The repository has no usable latest release.
    #[error("no release available for {owner}/{repo}: {reason}")]
    Unavailable {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
        /// Human readable cause.
        reason: String,
    },
    /// The latest release has nothing to download.
    #[error("latest release of {owner}/{repo} has no assets")]
    NoAssets {
        /// Repository owner.
        owner: String,
        /// Repository name.
        repo: String,
    },
    /// Transport level failure.
    #[error("request to {url} failed: {source}")]
    Http {
        /// Requested location.
        url: String,
        /// Underlying error.
        source: reqwest::Error,
    },
    /// The response body was not what we expected.
    #[error("failed to decode response from {url}: {reason}")]
    Decode {
        /// Requested location.
        url: String,
        /// Human readable cause.
        reason: String,
    },
}

/// Source of the list of mods tracked by a category.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetch the ordered manifest at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<RemoteModIdentity>, RemoteError>;
}

/// Resolves a repository to its latest published release.
#[async_trait]
pub trait ReleaseLookup: Send + Sync {
    /// Latest release of `owner/repo`.
    async fn fetch_latest(&self, owner: &str, repo: &str) -> Result<ReleaseInfo, RemoteError>;
}
