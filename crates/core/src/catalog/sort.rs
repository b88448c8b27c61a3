use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::models::CatalogRecord;

/// Field a catalog can be displayed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Mod name, case-insensitive.
    #[default]
    Name,
    /// Author, case-insensitive.
    Author,
    /// First release date, oldest first.
    InitialRelease,
    /// Latest release date, oldest first.
    LatestRelease,
}

impl SortKey {
    /// Every key, in menu order.
    pub const ALL: [SortKey; 4] = [
        SortKey::Name,
        SortKey::Author,
        SortKey::InitialRelease,
        SortKey::LatestRelease,
    ];
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SortKey::Name => "name",
            SortKey::Author => "author",
            SortKey::InitialRelease => "initial",
            SortKey::LatestRelease => "latest",
        };
        f.write_str(label)
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "author" => Ok(SortKey::Author),
            "initial" | "initial_release" => Ok(SortKey::InitialRelease),
            "latest" | "latest_release" => Ok(SortKey::LatestRelease),
            other => Err(format!(
                "unknown sort key `{other}` (expected name, author, initial or latest)"
            )),
        }
    }
}

/// Stable in-place sort; records comparing equal keep their relative order.
pub fn sort_records(records: &mut [CatalogRecord], key: SortKey) {
    match key {
        SortKey::Name => records.sort_by_cached_key(|record| record.name.to_lowercase()),
        SortKey::Author => records.sort_by_cached_key(|record| record.author.to_lowercase()),
        SortKey::InitialRelease => records.sort_by_key(|record| record.initial_release_date),
        SortKey::LatestRelease => records.sort_by_key(|record| record.latest_release_date),
    }
}
