/// Validated, slash-delimited relative paths into a storage backend.
///
/// Every path the registry writes or reads goes through this type, so a
/// backend never sees absolute paths, `..` components, or characters
/// outside `[A-Za-z0-9._-]`.
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::storage::StorageError;

/// A relative path inside a storage backend.
///
/// The empty path denotes the root and is only meaningful for listing
/// operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root path (no segments).
    pub fn root() -> Self {
        StorePath {
            segments: Vec::new(),
        }
    }

    /// Parse and validate a slash-delimited relative path.
    pub fn parse(input: &str) -> Result<Self, StorageError> {
        if input.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for segment in input.split('/') {
            segments.push(validate_segment(input, segment)?.to_string());
        }

        Ok(StorePath { segments })
    }

    /// Build a path from pre-validated segments.
    pub fn from_segments<I, S>(parts: I) -> Result<Self, StorageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut segments = Vec::new();
        for part in parts {
            let part = part.as_ref();
            segments.push(validate_segment(part, part)?.to_string());
        }
        Ok(StorePath { segments })
    }

    /// Append a single segment, returning the extended path.
    pub fn join(&self, segment: &str) -> Result<Self, StorageError> {
        let segment = validate_segment(segment, segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(StorePath { segments })
    }

    /// Last path element, if any.
    pub fn basename(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    /// The path with the last element removed. The parent of the root is
    /// the root.
    pub fn parent(&self) -> StorePath {
        let mut segments = self.segments.clone();
        segments.pop();
        StorePath { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

fn validate_segment<'a>(path: &str, segment: &'a str) -> Result<&'a str, StorageError> {
    if segment.is_empty() {
        return Err(StorageError::InvalidPath {
            path: path.to_string(),
            reason: "empty path segment".to_string(),
        });
    }
    if segment == "." || segment == ".." {
        return Err(StorageError::InvalidPath {
            path: path.to_string(),
            reason: format!("relative path segment {:?} is not allowed", segment),
        });
    }
    if let Some(c) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(StorageError::InvalidPath {
            path: path.to_string(),
            reason: format!("invalid character {:?} in path segment", c),
        });
    }
    Ok(segment)
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl Serialize for StorePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for StorePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        StorePath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let p = StorePath::parse("providers/h/hashicorp/aws.json").unwrap();
        assert_eq!(p.segments().len(), 4);
        assert_eq!(p.basename(), Some("aws.json"));
        assert_eq!(p.to_string(), "providers/h/hashicorp/aws.json");
    }

    #[test]
    fn test_parse_empty_is_root() {
        let p = StorePath::parse("").unwrap();
        assert!(p.is_root());
        assert_eq!(p.basename(), None);
    }

    #[test]
    fn test_rejects_double_slash() {
        let err = StorePath::parse("a//b").unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath { .. }));
    }

    #[test]
    fn test_rejects_dotdot() {
        assert!(StorePath::parse("a/../b").is_err());
        assert!(StorePath::parse("..").is_err());
        assert!(StorePath::parse(".").is_err());
    }

    #[test]
    fn test_rejects_invalid_characters() {
        assert!(StorePath::parse("a/b c").is_err());
        assert!(StorePath::parse("a/b\\c").is_err());
        assert!(StorePath::parse("/absolute").is_err());
        assert!(StorePath::parse("tr\u{e9}s").is_err());
    }

    #[test]
    fn test_join_and_parent() {
        let p = StorePath::parse("modules/o").unwrap();
        let q = p.join("opentofu").unwrap();
        assert_eq!(q.to_string(), "modules/o/opentofu");
        assert_eq!(q.parent(), p);
        assert!(p.join("bad segment").is_err());
    }
}
