// Registry toolkit for a Terraform-compatible module and provider
// registry: file-backed metadata storage, an OCI distribution client,
// and OpenPGP verification of provider release signatures.

pub mod address;
pub mod metadata;
pub mod oci;
pub mod path;
pub mod protocol;
pub mod retry;
pub mod storage;
pub mod verifier;
pub mod version;

pub use address::{InvalidAddr, ModuleAddr, ProviderAddr};
pub use metadata::{MetadataError, MetadataStore};
pub use path::StorePath;
pub use storage::{DiskStorage, MemoryStorage, StorageBackend, StorageError};
pub use verifier::{ProviderKeyVerifier, VerifierOptions, VerifyError};
pub use version::VersionNumber;
