//! Three-part release versions as published in release tags.

use std::{cmp::Ordering, fmt};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Version assigned to tags that cannot be parsed.
pub const SENTINEL: VersionTriple = VersionTriple::new(0, 1, 0);

/// A `major.minor.patch` version, ordered lexicographically by component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VersionTriple {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl VersionTriple {
    /// Build a version from its components.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a release tag such as `v1.2.0`.
    ///
    /// A leading `v`/`V` is stripped and missing components default to zero.
    /// Anything else that does not parse yields [`SENTINEL`], so a malformed
    /// tag reads as a very old release instead of an error.
    pub fn parse(text: &str) -> Self {
        static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?$").expect("invalid version regex")
        });

        let trimmed = text.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let Some(caps) = VERSION_RE.captures(trimmed) else {
            return SENTINEL;
        };

        let mut parts = [0u64; 3];
        for (index, slot) in parts.iter_mut().enumerate() {
            if let Some(value) = caps.get(index + 1) {
                match value.as_str().parse() {
                    Ok(number) => *slot = number,
                    Err(_) => return SENTINEL,
                }
            }
        }

        Self::new(parts[0], parts[1], parts[2])
    }

    /// Compare two versions, major first.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl From<String> for VersionTriple {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<VersionTriple> for String {
    fn from(value: VersionTriple) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_with_and_without_prefix() {
        assert_eq!(VersionTriple::parse("v1.2.3"), VersionTriple::new(1, 2, 3));
        assert_eq!(VersionTriple::parse("V2.0.1"), VersionTriple::new(2, 0, 1));
        assert_eq!(VersionTriple::parse("3.4"), VersionTriple::new(3, 4, 0));
        assert_eq!(VersionTriple::parse("7"), VersionTriple::new(7, 0, 0));
    }

    #[test]
    fn malformed_tags_become_sentinel() {
        assert_eq!(VersionTriple::parse("garbage"), SENTINEL);
        assert_eq!(VersionTriple::parse(""), SENTINEL);
        assert_eq!(VersionTriple::parse("v1.2.3-beta"), SENTINEL);
        assert_eq!(VersionTriple::parse("1.2.3.4"), SENTINEL);
    }

    #[test]
    fn orders_by_component() {
        assert_eq!(
            VersionTriple::parse("v1.2.0").compare(&VersionTriple::parse("v1.1.9")),
            Ordering::Greater
        );
        assert!(VersionTriple::parse("garbage") <= VersionTriple::parse("v0.1.0"));
        assert!(VersionTriple::parse("garbage") < VersionTriple::parse("v0.1.1"));
        assert!(VersionTriple::parse("v0.0.9") < VersionTriple::parse("garbage"));
        assert_eq!(
            VersionTriple::parse("v1.0").compare(&VersionTriple::parse("1.0.0")),
            Ordering::Equal
        );
    }

    #[test]
    fn serializes_as_dotted_string() -> serde_json::Result<()> {
        let json = serde_json::to_string(&VersionTriple::new(1, 10, 2))?;
        assert_eq!(json, "\"1.10.2\"");
        let parsed: VersionTriple = serde_json::from_str("\"v4.5\"")?;
        assert_eq!(parsed, VersionTriple::new(4, 5, 0));
        Ok(())
    }
}
