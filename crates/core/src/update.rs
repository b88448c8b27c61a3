//! Installer self-update check.

use tracing::info;

use crate::{
    remote::{ReleaseLookup, RemoteError},
    version::VersionTriple,
};

/// A newer installer release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerUpdate {
    /// Version of the newer release.
    pub version: VersionTriple,
    /// Release page to send the user to.
    pub page_url: String,
}

/// Look up the installer's own latest release and report it when newer than `current`.
pub async fn check_installer_update(
    releases: &dyn ReleaseLookup,
    owner: &str,
    repo: &str,
    current: VersionTriple,
) -> Result<Option<InstallerUpdate>, RemoteError> {
    let release = releases.fetch_latest(owner, repo).await?;
    let version = VersionTriple::parse(&release.tag_name);
    if version <= current {
        return Ok(None);
    }

    info!(%current, %version, "Installer update available");
    Ok(Some(InstallerUpdate {
        version,
        page_url: release.html_url,
    }))
}
