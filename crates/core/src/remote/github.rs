use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ReleaseLookup, RemoteError};
use crate::models::ReleaseInfo;

const API_ROOT: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    html_url: String,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    browser_download_url: String,
}

/// Release lookups against the GitHub REST API.
#[derive(Clone)]
pub struct GithubReleases {
    client: reqwest::Client,
    api_root: String,
    token: Option<String>,
}

impl GithubReleases {
    /// Build a client, authenticating with `token` when one is configured.
    pub fn new(user_agent: &str, token: Option<String>) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|source| RemoteError::Http {
                url: API_ROOT.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            api_root: API_ROOT.to_string(),
            token: token.filter(|value| !value.trim().is_empty()),
        })
    }

    /// Point the client at a different API host, e.g. an enterprise instance.
    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into().trim_end_matches('/').to_string();
        self
    }

    fn latest_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{owner}/{repo}/releases/latest", self.api_root)
    }
}

#[async_trait]
impl ReleaseLookup for GithubReleases {
    async fn fetch_latest(&self, owner: &str, repo: &str) -> Result<ReleaseInfo, RemoteError> {
        let url = self.latest_url(owner, repo);
        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| RemoteError::Http {
            url: url.clone(),
            source,
        })?;

        if let Some(remaining) = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|value| value.to_str().ok())
        {
            debug!(remaining, "github api quota");
        }

        let status = response.status();
        if !status.is_success() {
            let reason = match status {
                StatusCode::NOT_FOUND => "not found".to_string(),
                StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                    "api limit reached".to_string()
                }
                other => other.to_string(),
            };
            warn!("Github failure for {owner}/{repo}: {reason}");
            return Err(RemoteError::Unavailable {
                owner: owner.to_string(),
                repo: repo.to_string(),
                reason,
            });
        }

        let release: GithubRelease =
            response
                .json()
                .await
                .map_err(|err| RemoteError::Decode {
                    url: url.clone(),
                    reason: err.to_string(),
                })?;

        let first_asset_url = release
            .assets
            .into_iter()
            .next()
            .map(|asset| asset.browser_download_url)
            .ok_or_else(|| RemoteError::NoAssets {
                owner: owner.to_string(),
                repo: repo.to_string(),
            })?;

        Ok(ReleaseInfo {
            tag_name: release.tag_name,
            first_asset_url,
            html_url: release.html_url,
            published_at: release.published_at.unwrap_or(release.created_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_latest_release_url() -> Result<(), RemoteError> {
        let releases = GithubReleases::new("modcat-test", Some("  ".to_string()))?
            .with_api_root("http://localhost:9000/");
        assert_eq!(
            releases.latest_url("BrandenEK", "Blasphemous-Randomizer"),
            "http://localhost:9000/repos/BrandenEK/Blasphemous-Randomizer/releases/latest"
        );
        assert!(releases.token.is_none());
        Ok(())
    }

    #[test]
    fn decodes_release_payload() -> serde_json::Result<()> {
        let release: GithubRelease = serde_json::from_str(
            r#"{
                "tag_name": "v1.3.0",
                "html_url": "https://github.com/o/r/releases/tag/v1.3.0",
                "published_at": null,
                "created_at": "2024-03-02T10:00:00Z",
                "assets": [{"browser_download_url": "https://github.com/o/r/a.zip"}]
            }"#,
        )?;
        assert_eq!(release.tag_name, "v1.3.0");
        assert!(release.published_at.is_none());
        assert_eq!(release.assets.len(), 1);
        Ok(())
    }
}
