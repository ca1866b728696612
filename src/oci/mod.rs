/// OCI Distribution protocol support: addresses, credentials, the
/// WWW-Authenticate parser, and the raw and high-level registry clients.
pub mod address;
pub mod client;
pub mod credentials;
pub mod error;
pub mod manifest;
pub mod raw;
pub mod www_authenticate;

pub use address::{OciAddr, OciAddrWithDigest, OciAddrWithReference, OciDigest, OciReference, OciTag};
pub use client::{OciClient, ReferenceList};
pub use credentials::{BasicCredentials, Credentials, OciScope, ScopedCredentials};
pub use error::{DistributionErrorCode, ErrorEnvelope, OciError};
pub use manifest::{Descriptor, ImageIndex, ImageManifest, Manifest, Platform};
pub use raw::{BlobResponse, RawClientOptions, RawOciClient, TagList, Warnings};
pub use www_authenticate::AuthScheme;
