/// On-disk storage backend rooted at a directory.
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{StorageBackend, StorageError};
use crate::path::StorePath;

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Create a backend rooted at `root`. The directory itself is created
    /// lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DiskStorage { root: root.into() }
    }

    fn local_path(&self, path: &StorePath) -> PathBuf {
        let mut local = self.root.clone();
        for segment in path.segments() {
            local.push(segment);
        }
        local
    }

    fn io_error(path: &StorePath, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.clone(),
            source,
        }
    }

    async fn list_entries(
        &self,
        dir: &StorePath,
        want_dirs: bool,
    ) -> Result<Vec<String>, StorageError> {
        let local = self.local_path(dir);
        let mut reader = match tokio::fs::read_dir(&local).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error(dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| Self::io_error(dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| Self::io_error(dir, e))?;
            if file_type.is_dir() == want_dirs {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn create_parent_dirs(&self, path: &StorePath) -> Result<(), StorageError> {
        let parent = self.local_path(&path.parent());
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(DIR_MODE);
        builder
            .create(&parent)
            .await
            .map_err(|e| Self::io_error(path, e))
    }

    #[cfg(unix)]
    async fn set_file_mode(local: &Path, path: &StorePath) -> Result<(), StorageError> {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(local, std::fs::Permissions::from_mode(FILE_MODE))
            .await
            .map_err(|e| Self::io_error(path, e))
    }

    #[cfg(not(unix))]
    async fn set_file_mode(_local: &Path, _path: &StorePath) -> Result<(), StorageError> {
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for DiskStorage {
    async fn list_files(&self, dir: &StorePath) -> Result<Vec<String>, StorageError> {
        self.list_entries(dir, false).await
    }

    async fn list_directories(&self, dir: &StorePath) -> Result<Vec<String>, StorageError> {
        self.list_entries(dir, true).await
    }

    async fn get_file(&self, path: &StorePath) -> Result<Vec<u8>, StorageError> {
        match tokio::fs::read(self.local_path(path)).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound(path.clone()))
            }
            Err(e) => Err(Self::io_error(path, e)),
        }
    }

    async fn put_file(&self, path: &StorePath, contents: Vec<u8>) -> Result<(), StorageError> {
        if path.is_root() {
            return Err(StorageError::InvalidPath {
                path: path.to_string(),
                reason: "cannot write to the root path".to_string(),
            });
        }
        self.create_parent_dirs(path).await?;
        let local = self.local_path(path);
        tokio::fs::write(&local, contents)
            .await
            .map_err(|e| Self::io_error(path, e))?;
        Self::set_file_mode(&local, path).await
    }

    async fn file_exists(&self, path: &StorePath) -> Result<bool, StorageError> {
        match tokio::fs::metadata(self.local_path(path)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(path, e)),
        }
    }

    async fn delete_file(&self, path: &StorePath) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.local_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(path, e)),
        }
    }

    async fn download_file(
        &self,
        path: &StorePath,
        destination: &Path,
    ) -> Result<u64, StorageError> {
        let local = self.local_path(path);
        match tokio::fs::copy(&local, destination).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound(path.clone()))
            }
            Err(e) => Err(Self::io_error(path, e)),
        }
    }
}
