/// Stored metadata documents.
///
/// The JSON shapes here are consumed by existing registry tooling and must
/// not change field names.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::version::VersionNumber;

/// Metadata for a single module: an ordered list of versions, newest
/// first by convention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    pub versions: Vec<ModuleVersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub version: VersionNumber,
}

impl ModuleMetadata {
    /// Merge additional versions, deduplicating by normalized version
    /// string. Existing order is preserved; new versions are appended.
    pub fn merge_versions(&mut self, incoming: Vec<ModuleVersion>) {
        let mut seen: HashSet<String> = self
            .versions
            .iter()
            .map(|v| v.version.normalized())
            .collect();
        for version in incoming {
            if seen.insert(version.version.normalized()) {
                self.versions.push(version);
            }
        }
    }
}

/// Metadata for a single provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Custom upstream repository, when the provider does not live at the
    /// conventional `terraform-provider-<name>` location.
    #[serde(rename = "repository", default, skip_serializing_if = "Option::is_none")]
    pub custom_repository: Option<String>,

    pub versions: Vec<ProviderVersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderVersion {
    pub version: VersionNumber,
    pub protocols: Vec<String>,
    pub shasums_url: String,
    pub shasums_signature_url: String,
    pub targets: Vec<ProviderTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderTarget {
    pub os: String,
    pub arch: String,
    pub filename: String,
    pub download_url: String,
    pub shasum: String,
}

impl ProviderMetadata {
    /// Merge additional versions, deduplicating by normalized version
    /// string.
    pub fn merge_versions(&mut self, incoming: Vec<ProviderVersion>) {
        let mut seen: HashSet<String> = self
            .versions
            .iter()
            .map(|v| v.version.normalized())
            .collect();
        for version in incoming {
            if seen.insert(version.version.normalized()) {
                self.versions.push(version);
            }
        }
    }
}

/// An armored OpenPGP signing key stored for a provider namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningKey {
    /// Uppercase hex key ID.
    pub key_id: String,
    pub ascii_armor: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_version(v: &str) -> ModuleVersion {
        ModuleVersion {
            version: VersionNumber::parse(v).unwrap(),
        }
    }

    #[test]
    fn test_module_metadata_json_shape() {
        let meta = ModuleMetadata {
            versions: vec![module_version("v1.2.3")],
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"versions": [{"version": "v1.2.3"}]})
        );
    }

    #[test]
    fn test_merge_dedupes_by_normalized_version() {
        let mut meta = ModuleMetadata {
            versions: vec![module_version("v1.0.0")],
        };
        meta.merge_versions(vec![module_version("1.0.0"), module_version("v1.1.0")]);
        let normalized: Vec<String> = meta
            .versions
            .iter()
            .map(|v| v.version.normalized())
            .collect();
        assert_eq!(normalized, vec!["v1.0.0", "v1.1.0"]);
    }

    #[test]
    fn test_provider_metadata_omits_absent_repository() {
        let meta = ProviderMetadata::default();
        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("repository"));

        let with_repo = ProviderMetadata {
            custom_repository: Some("https://example.com/x".to_string()),
            versions: Vec::new(),
        };
        let json = serde_json::to_value(&with_repo).unwrap();
        assert_eq!(json["repository"], "https://example.com/x");
    }
}
