/// Abstract file storage for registry metadata.
///
/// Backends expose flat file operations over [`StorePath`]; directories
/// are synthesized from path prefixes where the backend has no real
/// directory concept.
mod disk;
mod memory;

use async_trait::async_trait;

use crate::path::StorePath;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The path failed validation before any I/O was attempted.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The requested file does not exist.
    #[error("file not found: {0}")]
    FileNotFound(StorePath),

    /// A file or directory with a conflicting name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(StorePath),

    /// An underlying I/O fault, with the path that produced it.
    #[error("I/O error on {path}")]
    Io {
        path: StorePath,
        #[source]
        source: std::io::Error,
    },
}

/// Storage contract shared by all backends.
///
/// - `get_file` on a missing path returns [`StorageError::FileNotFound`]
///   carrying that path.
/// - `put_file` creates intermediate directories.
/// - `delete_file` on a missing path succeeds silently.
/// - `file_exists` only errors on I/O faults, never on absence.
/// - Listing an absent directory returns an empty vector.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Names of the files directly inside `dir`.
    async fn list_files(&self, dir: &StorePath) -> Result<Vec<String>, StorageError>;

    /// Names of the subdirectories directly inside `dir`.
    async fn list_directories(&self, dir: &StorePath) -> Result<Vec<String>, StorageError>;

    async fn get_file(&self, path: &StorePath) -> Result<Vec<u8>, StorageError>;

    async fn put_file(&self, path: &StorePath, contents: Vec<u8>) -> Result<(), StorageError>;

    async fn file_exists(&self, path: &StorePath) -> Result<bool, StorageError>;

    async fn delete_file(&self, path: &StorePath) -> Result<(), StorageError>;

    /// Copy a stored file to a location on the local filesystem, returning
    /// the number of bytes written.
    async fn download_file(
        &self,
        path: &StorePath,
        destination: &std::path::Path,
    ) -> Result<u64, StorageError>;
}
