/// Module metadata operations.
use tracing::warn;

use crate::address::ModuleAddr;
use crate::path::StorePath;
use crate::storage::StorageError;

use super::{MetadataError, MetadataStore, ModuleMetadata};

impl MetadataStore {
    /// Enumerate every module address in the store. An absent `modules/`
    /// root yields an empty list.
    pub async fn list_modules(&self) -> Result<Vec<ModuleAddr>, MetadataError> {
        let root = StorePath::parse("modules")?;
        let mut addrs = Vec::new();
        for letter in self.storage().list_directories(&root).await? {
            let letter_dir = root.join(&letter)?;
            for namespace in self.storage().list_directories(&letter_dir).await? {
                self.collect_namespace_modules(&letter_dir, &namespace, &mut addrs)
                    .await?;
            }
        }
        Ok(addrs)
    }

    /// Enumerate the modules of a single namespace.
    pub async fn list_modules_by_namespace(
        &self,
        namespace: &str,
    ) -> Result<Vec<ModuleAddr>, MetadataError> {
        let namespace = namespace.to_lowercase();
        let Some(letter) = namespace.chars().next() else {
            return Ok(Vec::new());
        };
        let letter_dir = StorePath::from_segments(["modules", &letter.to_string()])?;
        let mut addrs = Vec::new();
        self.collect_namespace_modules(&letter_dir, &namespace, &mut addrs)
            .await?;
        Ok(addrs)
    }

    async fn collect_namespace_modules(
        &self,
        letter_dir: &StorePath,
        namespace: &str,
        addrs: &mut Vec<ModuleAddr>,
    ) -> Result<(), MetadataError> {
        let ns_dir = letter_dir.join(namespace)?;
        for name in self.storage().list_directories(&ns_dir).await? {
            let name_dir = ns_dir.join(&name)?;
            for file in self.storage().list_files(&name_dir).await? {
                let Some(target_system) = file.strip_suffix(".json") else {
                    continue;
                };
                match ModuleAddr::new(namespace, &name, target_system) {
                    Ok(addr) => addrs.push(addr),
                    Err(e) => warn!(file = %file, error = %e, "skipping unparseable module entry"),
                }
            }
        }
        Ok(())
    }

    /// Fetch module metadata. A missing file maps to
    /// [`MetadataError::ModuleNotFound`] wrapping the storage cause.
    pub async fn get_module(&self, addr: &ModuleAddr) -> Result<ModuleMetadata, MetadataError> {
        let path = addr.metadata_path()?;
        match self.read_json(&path).await {
            Err(MetadataError::Storage(source @ StorageError::FileNotFound(_))) => {
                Err(MetadataError::ModuleNotFound {
                    addr: addr.normalize(),
                    source,
                })
            }
            other => other,
        }
    }

    /// Write module metadata. A full overwrite; callers that want to merge
    /// must read-merge-write.
    pub async fn put_module(
        &self,
        addr: &ModuleAddr,
        metadata: &ModuleMetadata,
    ) -> Result<(), MetadataError> {
        let path = addr.metadata_path()?;
        self.write_json(&path, metadata).await
    }

    /// Remove a module record. Removing an absent record is a no-op.
    pub async fn delete_module(&self, addr: &ModuleAddr) -> Result<(), MetadataError> {
        let path = addr.metadata_path()?;
        self.storage().delete_file(&path).await?;
        Ok(())
    }
}
