/// Registry version numbers.
///
/// Stored version strings carry a `v` prefix (`v1.2.3`); input is accepted
/// with or without it. Ordering is semver order via the `semver` crate.
use std::cmp::Ordering;
use std::fmt;

use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
#[error("invalid version {value:?}: {source}")]
pub struct InvalidVersion {
    pub value: String,
    #[source]
    source: semver::Error,
}

/// A parsed, normalized version number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionNumber(Version);

impl VersionNumber {
    pub fn parse(input: &str) -> Result<Self, InvalidVersion> {
        let trimmed = input.strip_prefix('v').unwrap_or(input);
        let version = Version::parse(trimmed).map_err(|source| InvalidVersion {
            value: input.to_string(),
            source,
        })?;
        Ok(VersionNumber(version))
    }

    /// The canonical `v`-prefixed rendering.
    pub fn normalized(&self) -> String {
        format!("v{}", self.0)
    }

    pub fn semver(&self) -> &Version {
        &self.0
    }
}

impl PartialOrd for VersionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())
    }
}

impl Serialize for VersionNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.normalized())
    }
}

impl<'de> Deserialize<'de> for VersionNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        VersionNumber::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_prefix() {
        let a = VersionNumber::parse("v1.2.3").unwrap();
        let b = VersionNumber::parse("1.2.3").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.normalized(), "v1.2.3");
    }

    #[test]
    fn test_ordering() {
        let a = VersionNumber::parse("1.9.0").unwrap();
        let b = VersionNumber::parse("1.10.0").unwrap();
        let rc = VersionNumber::parse("1.10.0-rc1").unwrap();
        assert!(a < b);
        assert!(rc < b);
        assert!(a < rc);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(VersionNumber::parse("not-a-version").is_err());
        assert!(VersionNumber::parse("1.2").is_err());
        assert!(VersionNumber::parse("").is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let v: VersionNumber = serde_json::from_str("\"1.0.0\"").unwrap();
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"v1.0.0\"");
    }
}
