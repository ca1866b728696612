/// Provider metadata operations and alias canonicalization.
use std::collections::HashSet;

use tracing::warn;

use crate::address::ProviderAddr;
use crate::path::StorePath;
use crate::storage::StorageError;

use super::{MetadataError, MetadataStore, ProviderMetadata};

impl MetadataStore {
    /// Enumerate provider addresses. With `include_aliases`, the result
    /// also contains alias addresses whose canonical target exists,
    /// deduplicated over normalized addresses.
    pub async fn list_providers(
        &self,
        include_aliases: bool,
    ) -> Result<Vec<ProviderAddr>, MetadataError> {
        let mut stored = Vec::new();
        let root = StorePath::parse("providers")?;
        for letter in self.storage().list_directories(&root).await? {
            let letter_dir = root.join(&letter)?;
            for namespace in self.storage().list_directories(&letter_dir).await? {
                let ns_dir = letter_dir.join(&namespace)?;
                for file in self.storage().list_files(&ns_dir).await? {
                    let Some(name) = file.strip_suffix(".json") else {
                        continue;
                    };
                    match ProviderAddr::new(&namespace, name) {
                        Ok(addr) => stored.push(addr.normalize()),
                        Err(e) => {
                            warn!(file = %file, error = %e, "skipping unparseable provider entry")
                        }
                    }
                }
            }
        }

        if !include_aliases {
            return Ok(stored);
        }

        let mut result: HashSet<ProviderAddr> = stored.iter().cloned().collect();

        // Namespace aliases mirror every provider stored under the target
        // namespace, whether or not the alias letter shard exists on disk.
        for (alias_ns, canonical_ns) in self.aliases().namespaces() {
            for addr in &stored {
                if addr.namespace == canonical_ns {
                    result.insert(
                        ProviderAddr {
                            namespace: alias_ns.to_string(),
                            name: addr.name.clone(),
                        }
                        .normalize(),
                    );
                }
            }
        }

        // Provider aliases appear when their canonical target exists.
        let stored_set: HashSet<&ProviderAddr> = stored.iter().collect();
        for (alias, target) in self.aliases().providers() {
            if stored_set.contains(&target.normalize()) {
                result.insert(alias.normalize());
            }
        }

        let mut result: Vec<ProviderAddr> = result.into_iter().collect();
        result.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        Ok(result)
    }

    /// Enumerate the providers of one namespace, optionally including
    /// alias addresses within that namespace.
    pub async fn list_providers_by_namespace(
        &self,
        namespace: &str,
        include_aliases: bool,
    ) -> Result<Vec<ProviderAddr>, MetadataError> {
        let namespace = namespace.to_lowercase();
        let all = self.list_providers(include_aliases).await?;
        Ok(all
            .into_iter()
            .filter(|addr| addr.namespace == namespace)
            .collect())
    }

    /// Resolve an address through the alias tables: one namespace hop,
    /// then one provider hop. Each step normalizes.
    pub fn provider_canonical_addr(&self, addr: &ProviderAddr) -> ProviderAddr {
        let mut current = addr.normalize();
        if let Some(target_ns) = self.aliases().namespace_target(&current.namespace) {
            current = ProviderAddr {
                namespace: target_ns.to_string(),
                name: current.name,
            }
            .normalize();
        }
        if let Some(target) = self.aliases().provider_target(&current) {
            current = target.normalize();
        }
        current
    }

    /// All alias addresses whose canonical form equals `addr`, excluding
    /// `addr` itself.
    pub fn provider_reverse_aliases(&self, addr: &ProviderAddr) -> Vec<ProviderAddr> {
        let canonical = addr.normalize();
        let mut result = Vec::new();

        for (alias, target) in self.aliases().providers() {
            if target.normalize() == canonical {
                let alias = alias.normalize();
                // A namespace alias pointing at the provider alias's
                // namespace chains into the same canonical address.
                for (alias_ns, canonical_ns) in self.aliases().namespaces() {
                    if canonical_ns == alias.namespace {
                        result.push(
                            ProviderAddr {
                                namespace: alias_ns.to_string(),
                                name: alias.name.clone(),
                            }
                            .normalize(),
                        );
                    }
                }
                result.push(alias);
            }
        }

        for (alias_ns, canonical_ns) in self.aliases().namespaces() {
            if canonical_ns == canonical.namespace {
                let candidate = ProviderAddr {
                    namespace: alias_ns.to_string(),
                    name: canonical.name.clone(),
                }
                .normalize();
                if self.provider_canonical_addr(&candidate) == canonical {
                    result.push(candidate);
                }
            }
        }

        let mut seen = HashSet::new();
        result.retain(|a| *a != canonical && seen.insert(a.clone()));
        result
    }

    /// Fetch provider metadata. With `resolve_aliases`, the address is
    /// canonicalized first; the returned metadata is the canonical record
    /// and does not echo the aliased address.
    pub async fn get_provider(
        &self,
        addr: &ProviderAddr,
        resolve_aliases: bool,
    ) -> Result<ProviderMetadata, MetadataError> {
        let lookup = if resolve_aliases {
            self.provider_canonical_addr(addr)
        } else {
            addr.normalize()
        };
        let path = lookup.metadata_path()?;
        match self.read_json(&path).await {
            Err(MetadataError::Storage(source @ StorageError::FileNotFound(_))) => {
                Err(MetadataError::ProviderNotFound {
                    addr: addr.normalize(),
                    source: Some(source),
                })
            }
            other => other,
        }
    }

    /// Write provider metadata at the raw (unresolved) address. A full
    /// overwrite.
    pub async fn put_provider(
        &self,
        addr: &ProviderAddr,
        metadata: &ProviderMetadata,
    ) -> Result<(), MetadataError> {
        let path = addr.metadata_path()?;
        self.write_json(&path, metadata).await
    }

    /// Remove a provider record. Alias addresses cannot be deleted;
    /// deletion always acts on the raw path.
    pub async fn delete_provider(&self, addr: &ProviderAddr) -> Result<(), MetadataError> {
        let path = addr.metadata_path()?;
        self.storage().delete_file(&path).await?;
        Ok(())
    }
}
