/// Metadata API over a storage backend.
///
/// Provides CRUD and listing for modules, providers, and provider signing
/// keys, plus alias canonicalization. The API holds no locks of its own;
/// concurrent mutation of the same address is a caller concern.
mod aliases;
mod keys;
mod modules;
mod providers;
mod types;

use std::sync::Arc;

use crate::address::{InvalidAddr, ModuleAddr, ProviderAddr};
use crate::path::StorePath;
use crate::storage::{StorageBackend, StorageError};

pub use aliases::{aliases_path, AliasTable};
pub use types::{
    ModuleMetadata, ModuleVersion, ProviderMetadata, ProviderTarget, ProviderVersion, SigningKey,
};

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("module not found: {addr}")]
    ModuleNotFound {
        addr: ModuleAddr,
        #[source]
        source: StorageError,
    },

    #[error("provider not found: {addr}")]
    ProviderNotFound {
        addr: ProviderAddr,
        #[source]
        source: Option<StorageError>,
    },

    #[error("no key {key_id} in namespace {namespace}")]
    KeyNotFound { namespace: String, key_id: String },

    #[error(transparent)]
    InvalidAddr(#[from] InvalidAddr),

    /// An armored key failed to parse.
    #[error("invalid signing key at {path}")]
    InvalidKey {
        path: StorePath,
        #[source]
        source: pgp::errors::Error,
    },

    /// A metadata file held malformed JSON. Fatal for the operation but
    /// does not taint other keys.
    #[error("failed to decode metadata at {path}")]
    Parse {
        path: StorePath,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The registry metadata API. Cheap to clone.
#[derive(Clone)]
pub struct MetadataStore {
    storage: Arc<dyn StorageBackend>,
    aliases: Arc<AliasTable>,
}

impl MetadataStore {
    /// Build a store with the built-in alias table.
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self::with_aliases(storage, AliasTable::default())
    }

    pub fn with_aliases(storage: Arc<dyn StorageBackend>, aliases: AliasTable) -> Self {
        MetadataStore {
            storage,
            aliases: Arc::new(aliases),
        }
    }

    /// Build a store whose alias table is loaded from
    /// `providers/_aliases.json` when present.
    pub async fn load(storage: Arc<dyn StorageBackend>) -> Result<Self, MetadataError> {
        let aliases = AliasTable::load(storage.as_ref()).await?;
        Ok(Self::with_aliases(storage, aliases))
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub(crate) fn storage(&self) -> &dyn StorageBackend {
        self.storage.as_ref()
    }

    pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &StorePath,
    ) -> Result<T, MetadataError> {
        let data = self.storage.get_file(path).await?;
        serde_json::from_slice(&data).map_err(|source| MetadataError::Parse {
            path: path.clone(),
            source,
        })
    }

    pub(crate) async fn write_json<T: serde::Serialize>(
        &self,
        path: &StorePath,
        value: &T,
    ) -> Result<(), MetadataError> {
        let data = serde_json::to_vec_pretty(value).map_err(|source| MetadataError::Parse {
            path: path.clone(),
            source,
        })?;
        self.storage.put_file(path, data).await?;
        Ok(())
    }
}
