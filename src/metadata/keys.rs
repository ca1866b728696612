/// Provider namespace signing keys.
///
/// Keys live at `keys/<l>/<namespace>/<KEYID>.asc`, one armored public
/// key per file, named by the uppercase hex key ID of the primary key.
use pgp::composed::{Deserializable, SignedPublicKey};
use pgp::types::KeyTrait;

use crate::path::StorePath;

use super::{MetadataError, MetadataStore, SigningKey};

/// Uppercase hex rendering of a key ID.
pub(crate) fn format_key_id(key: &SignedPublicKey) -> String {
    key.key_id()
        .as_ref()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect()
}

fn namespace_key_dir(namespace: &str) -> Result<Option<StorePath>, MetadataError> {
    let namespace = namespace.to_lowercase();
    let Some(letter) = namespace.chars().next() else {
        return Ok(None);
    };
    Ok(Some(StorePath::from_segments([
        "keys",
        &letter.to_string(),
        &namespace,
    ])?))
}

fn parse_armored_key(path: &StorePath, armor: &str) -> Result<SignedPublicKey, MetadataError> {
    let (key, _headers) =
        SignedPublicKey::from_string(armor).map_err(|source| MetadataError::InvalidKey {
            path: path.clone(),
            source,
        })?;
    Ok(key)
}

impl MetadataStore {
    /// The key IDs of every armored key stored for a namespace.
    pub async fn list_provider_namespace_key_ids(
        &self,
        namespace: &str,
    ) -> Result<Vec<String>, MetadataError> {
        Ok(self
            .namespace_keys(namespace)
            .await?
            .into_iter()
            .map(|(_, key)| key.key_id)
            .collect())
    }

    /// The first stored key whose ID matches `key_id` (case-insensitive).
    pub async fn get_provider_namespace_key(
        &self,
        namespace: &str,
        key_id: &str,
    ) -> Result<SigningKey, MetadataError> {
        let wanted = key_id.to_uppercase();
        for (_, key) in self.namespace_keys(namespace).await? {
            if key.key_id == wanted {
                return Ok(key);
            }
        }
        Err(MetadataError::KeyNotFound {
            namespace: namespace.to_lowercase(),
            key_id: wanted,
        })
    }

    /// Store an armored key. When a stored file already carries the same
    /// key ID that file is overwritten; otherwise a new `<KEYID>.asc` is
    /// created.
    pub async fn put_provider_namespace_key(
        &self,
        namespace: &str,
        ascii_armor: &str,
    ) -> Result<SigningKey, MetadataError> {
        let Some(dir) = namespace_key_dir(namespace)? else {
            return Err(MetadataError::InvalidAddr(crate::address::InvalidAddr {
                value: namespace.to_string(),
                reason: "must not be empty".to_string(),
            }));
        };
        let key = parse_armored_key(&dir, ascii_armor)?;
        let key_id = format_key_id(&key);

        let mut path = dir.join(&format!("{}.asc", key_id))?;
        for (existing_path, existing) in self.namespace_keys(namespace).await? {
            if existing.key_id == key_id {
                path = existing_path;
                break;
            }
        }

        self.storage()
            .put_file(&path, ascii_armor.as_bytes().to_vec())
            .await?;
        Ok(SigningKey {
            key_id,
            ascii_armor: ascii_armor.to_string(),
        })
    }

    /// Remove the stored key with the given ID. A no-op when no stored
    /// key matches.
    pub async fn delete_provider_namespace_key(
        &self,
        namespace: &str,
        key_id: &str,
    ) -> Result<(), MetadataError> {
        let wanted = key_id.to_uppercase();
        for (path, key) in self.namespace_keys(namespace).await? {
            if key.key_id == wanted {
                self.storage().delete_file(&path).await?;
            }
        }
        Ok(())
    }

    async fn namespace_keys(
        &self,
        namespace: &str,
    ) -> Result<Vec<(StorePath, SigningKey)>, MetadataError> {
        let Some(dir) = namespace_key_dir(namespace)? else {
            return Ok(Vec::new());
        };
        let mut keys = Vec::new();
        for file in self.storage().list_files(&dir).await? {
            if !file.ends_with(".asc") {
                continue;
            }
            let path = dir.join(&file)?;
            let data = self.storage().get_file(&path).await?;
            let armor = String::from_utf8(data).map_err(|e| MetadataError::InvalidKey {
                path: path.clone(),
                source: pgp::errors::Error::Message(format!("key is not UTF-8: {}", e)),
            })?;
            let key = parse_armored_key(&path, &armor)?;
            keys.push((
                path,
                SigningKey {
                    key_id: format_key_id(&key),
                    ascii_armor: armor,
                },
            ));
        }
        Ok(keys)
    }
}
