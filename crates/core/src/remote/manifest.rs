use async_trait::async_trait;
use tracing::debug;

use super::{ManifestSource, RemoteError};
use crate::models::RemoteModIdentity;

/// Downloads a JSON manifest over HTTP.
#[derive(Clone)]
pub struct HttpManifestSource {
    client: reqwest::Client,
}

impl HttpManifestSource {
    /// Build a source identifying itself with `user_agent`.
    pub fn new(user_agent: &str) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|source| RemoteError::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ManifestSource for HttpManifestSource {
    async fn fetch(&self, url: &str) -> Result<Vec<RemoteModIdentity>, RemoteError> {
        debug!(url, "fetching manifest");
        let http = |source: reqwest::Error| RemoteError::Http {
            url: url.to_string(),
            source,
        };

        let body = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(http)?
            .text()
            .await
            .map_err(http)?;

        serde_json::from_str(&body).map_err(|err| RemoteError::Decode {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}
