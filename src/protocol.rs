/// Wire shapes served to registry protocol consumers.
///
/// These serialize to the JSON the existing v1 registry API emits; field
/// names are load-bearing.
use serde::{Deserialize, Serialize};

use crate::metadata::{ProviderMetadata, SigningKey};

/// Response body for `GET /v1/providers/{ns}/{name}/versions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListProviderVersionsResponse {
    pub versions: Vec<ProviderVersionSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderVersionSummary {
    pub version: String,
    pub protocols: Vec<String>,
    pub platforms: Vec<ProviderPlatform>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPlatform {
    pub os: String,
    pub arch: String,
}

impl ListProviderVersionsResponse {
    pub fn from_metadata(metadata: &ProviderMetadata) -> Self {
        ListProviderVersionsResponse {
            versions: metadata
                .versions
                .iter()
                .map(|v| ProviderVersionSummary {
                    // The v1 protocol serves bare semver, no prefix.
                    version: v.version.semver().to_string(),
                    protocols: v.protocols.clone(),
                    platforms: v
                        .targets
                        .iter()
                        .map(|t| ProviderPlatform {
                            os: t.os.clone(),
                            arch: t.arch.clone(),
                        })
                        .collect(),
                })
                .collect(),
            warnings: Vec::new(),
        }
    }
}

/// Response body for
/// `GET /v1/providers/{ns}/{name}/{version}/download/{os}/{arch}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetProviderVersionResponse {
    pub protocols: Vec<String>,
    pub os: String,
    pub arch: String,
    pub filename: String,
    pub download_url: String,
    pub shasums_url: String,
    pub shasums_signature_url: String,
    pub shasum: String,
    pub signing_keys: SigningKeys,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SigningKeys {
    pub gpg_public_keys: Vec<GpgPublicKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpgPublicKey {
    pub key_id: String,
    pub ascii_armor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl From<SigningKey> for GpgPublicKey {
    fn from(key: SigningKey) -> Self {
        GpgPublicKey {
            key_id: key.key_id,
            ascii_armor: key.ascii_armor,
            trust_signature: None,
            source: None,
            source_url: None,
        }
    }
}

impl GetProviderVersionResponse {
    /// Select one `(version, os, arch)` tuple out of provider metadata.
    /// Returns `None` when the version or target is absent.
    pub fn select(
        metadata: &ProviderMetadata,
        version: &crate::version::VersionNumber,
        os: &str,
        arch: &str,
        signing_keys: Vec<SigningKey>,
    ) -> Option<Self> {
        let v = metadata.versions.iter().find(|v| v.version == *version)?;
        let target = v.targets.iter().find(|t| t.os == os && t.arch == arch)?;
        Some(GetProviderVersionResponse {
            protocols: v.protocols.clone(),
            os: target.os.clone(),
            arch: target.arch.clone(),
            filename: target.filename.clone(),
            download_url: target.download_url.clone(),
            shasums_url: v.shasums_url.clone(),
            shasums_signature_url: v.shasums_signature_url.clone(),
            shasum: target.shasum.clone(),
            signing_keys: SigningKeys {
                gpg_public_keys: signing_keys.into_iter().map(Into::into).collect(),
            },
        })
    }
}

/// The `/.well-known/terraform.json` service discovery document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDiscovery {
    #[serde(rename = "providers.v1")]
    pub providers_v1: String,
    #[serde(rename = "modules.v1")]
    pub modules_v1: String,
}

impl Default for ServiceDiscovery {
    fn default() -> Self {
        ServiceDiscovery {
            providers_v1: "/v1/providers/".to_string(),
            modules_v1: "/v1/modules/".to_string(),
        }
    }
}
