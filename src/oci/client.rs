/// High-level OCI client built on [`RawOciClient`].
use super::address::{OciAddr, OciAddrWithDigest, OciAddrWithReference, OciReference};
use super::error::OciError;
use super::raw::{RawOciClient, Warnings};

/// Tags available for a repository, with any registry warnings emitted
/// while listing them.
#[derive(Debug)]
pub struct ReferenceList {
    pub addr: OciAddr,
    pub references: Vec<OciReference>,
    pub warnings: Warnings,
}

pub struct OciClient {
    raw: RawOciClient,
}

impl OciClient {
    pub fn new(raw: RawOciClient) -> Self {
        OciClient { raw }
    }

    pub fn raw(&self) -> &RawOciClient {
        &self.raw
    }

    /// Verify the registry speaks the distribution API, then list the
    /// repository's tags. Warnings from both calls are merged. Tags the
    /// registry reports that do not satisfy the tag grammar are an error;
    /// a registry emitting them is not one we can address content on.
    pub async fn list_references(&self, addr: &OciAddr) -> Result<ReferenceList, OciError> {
        let mut warnings = self.raw.check(&addr.registry).await?;
        let (tag_list, discovery_warnings) = self.raw.content_discovery(addr).await?;
        warnings.merge(discovery_warnings);

        let mut references = Vec::with_capacity(tag_list.tags.len());
        for tag in &tag_list.tags {
            references.push(OciReference::parse(tag)?);
        }

        Ok(ReferenceList {
            addr: addr.clone(),
            references,
            warnings,
        })
    }

    /// Resolve an index reference to the image digest for one platform.
    pub async fn resolve_platform_image_digest(
        &self,
        _addr: &OciAddrWithReference,
        _os: &str,
        _arch: &str,
    ) -> Result<OciAddrWithDigest, OciError> {
        Err(OciError::NotImplemented("resolve_platform_image_digest"))
    }

    /// Pull an image by tag or digest reference.
    pub async fn pull_image(&self, _addr: &OciAddrWithReference) -> Result<(), OciError> {
        Err(OciError::NotImplemented("pull_image"))
    }

    /// Pull an image by resolved digest.
    pub async fn pull_image_with_image_digest(
        &self,
        _addr: &OciAddrWithDigest,
    ) -> Result<(), OciError> {
        Err(OciError::NotImplemented("pull_image_with_image_digest"))
    }
}
