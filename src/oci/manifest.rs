/// OCI manifest types and parsing
///
/// Supports:
/// - OCI Image Manifest (application/vnd.oci.image.manifest.v1+json)
/// - Docker Manifest V2 (application/vnd.docker.distribution.manifest.v2+json)
/// - OCI Image Index / Docker Manifest List
use serde::Deserialize;

use super::OciError;

/// Media types for OCI/Docker manifests
pub mod media_types {
    pub const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
    pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
    pub const OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";
    pub const DOCKER_MANIFEST_LIST: &str =
        "application/vnd.docker.distribution.manifest.list.v2+json";

    /// The Accept value for manifest requests.
    pub fn accept_header() -> String {
        format!(
            "{}, {}, {}, {}",
            OCI_MANIFEST, DOCKER_MANIFEST_V2, OCI_INDEX, DOCKER_MANIFEST_LIST
        )
    }
}

/// OCI content descriptor
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub media_type: String,

    /// Content digest (e.g. "sha256:abc123...")
    pub digest: String,

    /// Size in bytes
    pub size: u64,

    #[serde(default)]
    pub annotations: Option<std::collections::HashMap<String, String>>,

    /// Platform (for indexes/manifest lists)
    #[serde(default)]
    pub platform: Option<Platform>,
}

/// Platform specification
#[derive(Debug, Clone, Deserialize)]
pub struct Platform {
    pub architecture: String,
    pub os: String,
    #[serde(default)]
    pub variant: Option<String>,
}

/// OCI Image Manifest
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// Schema version (should be 2)
    pub schema_version: u32,

    #[serde(default)]
    pub media_type: Option<String>,

    /// Config blob descriptor
    pub config: Descriptor,

    /// Layer descriptors
    pub layers: Vec<Descriptor>,

    #[serde(default)]
    pub annotations: Option<std::collections::HashMap<String, String>>,
}

/// OCI Image Index (manifest list)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndex {
    /// Schema version (should be 2)
    pub schema_version: u32,

    #[serde(default)]
    pub media_type: Option<String>,

    /// Manifest descriptors
    pub manifests: Vec<Descriptor>,
}

/// Parsed manifest - either a single image manifest or an index.
#[derive(Debug)]
pub enum Manifest {
    Image(ImageManifest),
    Index(ImageIndex),
}

impl Manifest {
    /// Parse manifest bytes, dispatching on the Content-Type the registry
    /// declared. Content sniffing is deliberately not attempted; a
    /// registry that serves a manifest under the wrong media type is
    /// broken and we report it as such.
    pub fn parse(data: &[u8], content_type: &str) -> Result<Self, OciError> {
        // Parameters after ';' are irrelevant to the dispatch.
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim();

        match media_type {
            media_types::OCI_INDEX | media_types::DOCKER_MANIFEST_LIST => {
                let index: ImageIndex = serde_json::from_slice(data).map_err(|e| {
                    OciError::Protocol(format!("invalid manifest index document: {}", e))
                })?;
                Ok(Manifest::Index(index))
            }
            media_types::OCI_MANIFEST | media_types::DOCKER_MANIFEST_V2 => {
                let manifest: ImageManifest = serde_json::from_slice(data).map_err(|e| {
                    OciError::Protocol(format!("invalid image manifest document: {}", e))
                })?;
                Ok(Manifest::Image(manifest))
            }
            other => Err(OciError::Protocol(format!(
                "unsupported manifest media type {:?}",
                other
            ))),
        }
    }
}

impl ImageIndex {
    /// Find the manifest descriptor for a specific platform
    pub fn find_platform(&self, os: &str, arch: &str) -> Option<&Descriptor> {
        self.manifests.iter().find(|m| {
            m.platform
                .as_ref()
                .is_some_and(|p| p.os == os && p.architecture == arch)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE_JSON: &str = r#"{
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.manifest.v1+json",
        "config": {
            "mediaType": "application/vnd.oci.image.config.v1+json",
            "digest": "sha256:config123",
            "size": 1234
        },
        "layers": [
            {
                "mediaType": "application/vnd.oci.image.layer.v1.tar+gzip",
                "digest": "sha256:layer123",
                "size": 5678
            }
        ]
    }"#;

    const INDEX_JSON: &str = r#"{
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.index.v1+json",
        "manifests": [
            {
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": "sha256:manifest123",
                "size": 1000,
                "platform": {
                    "architecture": "arm64",
                    "os": "linux"
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_image_manifest() {
        let manifest = Manifest::parse(IMAGE_JSON.as_bytes(), media_types::OCI_MANIFEST).unwrap();
        match manifest {
            Manifest::Image(m) => {
                assert_eq!(m.schema_version, 2);
                assert_eq!(m.layers.len(), 1);
                assert_eq!(m.layers[0].digest, "sha256:layer123");
            }
            _ => panic!("Expected image manifest"),
        }
    }

    #[test]
    fn test_parse_index() {
        let manifest = Manifest::parse(INDEX_JSON.as_bytes(), media_types::OCI_INDEX).unwrap();
        match manifest {
            Manifest::Index(idx) => {
                assert_eq!(idx.manifests.len(), 1);
                let found = idx.find_platform("linux", "arm64").unwrap();
                assert_eq!(found.digest, "sha256:manifest123");
                assert!(idx.find_platform("linux", "amd64").is_none());
            }
            _ => panic!("Expected manifest index"),
        }
    }

    #[test]
    fn test_dispatch_follows_content_type_not_body() {
        // An index body under an image media type must fail to decode as
        // an image manifest rather than silently become an index.
        let err = Manifest::parse(INDEX_JSON.as_bytes(), media_types::OCI_MANIFEST).unwrap_err();
        assert!(matches!(err, OciError::Protocol(_)));
    }

    #[test]
    fn test_content_type_parameters_ignored() {
        let manifest = Manifest::parse(
            IMAGE_JSON.as_bytes(),
            "application/vnd.oci.image.manifest.v1+json; charset=utf-8",
        )
        .unwrap();
        assert!(matches!(manifest, Manifest::Image(_)));
    }

    #[test]
    fn test_unknown_media_type_rejected() {
        let err = Manifest::parse(IMAGE_JSON.as_bytes(), "text/html").unwrap_err();
        assert!(matches!(err, OciError::Protocol(_)));
    }
}
