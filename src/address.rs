/// Module and provider addresses.
///
/// Addresses are case-preserving on input but all comparisons, hashing,
/// and on-disk paths use the lowercased normalized form. The first letter
/// of the namespace shards the on-disk layout to bound directory fan-out.
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::path::StorePath;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
#[error("invalid address component {value:?}: {reason}")]
pub struct InvalidAddr {
    pub value: String,
    pub reason: String,
}

fn validate_component(value: &str) -> Result<(), InvalidAddr> {
    if value.is_empty() {
        return Err(InvalidAddr {
            value: value.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if let Some(c) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_')))
    {
        return Err(InvalidAddr {
            value: value.to_string(),
            reason: format!("invalid character {:?}", c),
        });
    }
    Ok(())
}

fn shard_letter(namespace: &str) -> String {
    namespace
        .chars()
        .next()
        .map(|c| c.to_ascii_lowercase().to_string())
        .unwrap_or_default()
}

/// Address of a module: `(namespace, name, target_system)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleAddr {
    pub namespace: String,
    pub name: String,
    pub target_system: String,
}

impl ModuleAddr {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        target_system: impl Into<String>,
    ) -> Result<Self, InvalidAddr> {
        let addr = ModuleAddr {
            namespace: namespace.into(),
            name: name.into(),
            target_system: target_system.into(),
        };
        addr.validate()?;
        Ok(addr)
    }

    pub fn validate(&self) -> Result<(), InvalidAddr> {
        validate_component(&self.namespace)?;
        validate_component(&self.name)?;
        validate_component(&self.target_system)
    }

    /// The lowercased form used for comparisons and storage.
    pub fn normalize(&self) -> ModuleAddr {
        ModuleAddr {
            namespace: self.namespace.to_lowercase(),
            name: self.name.to_lowercase(),
            target_system: self.target_system.to_lowercase(),
        }
    }

    /// Canonical metadata path:
    /// `modules/<l>/<namespace>/<name>/<target_system>.json`.
    pub fn metadata_path(&self) -> Result<StorePath, StorageError> {
        let n = self.normalize();
        StorePath::from_segments([
            "modules",
            &shard_letter(&n.namespace),
            &n.namespace,
            &n.name,
            &format!("{}.json", n.target_system),
        ])
    }
}

impl PartialEq for ModuleAddr {
    fn eq(&self, other: &Self) -> bool {
        self.namespace.eq_ignore_ascii_case(&other.namespace)
            && self.name.eq_ignore_ascii_case(&other.name)
            && self.target_system.eq_ignore_ascii_case(&other.target_system)
    }
}

impl Eq for ModuleAddr {}

impl Hash for ModuleAddr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.to_lowercase().hash(state);
        self.name.to_lowercase().hash(state);
        self.target_system.to_lowercase().hash(state);
    }
}

impl fmt::Display for ModuleAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.namespace, self.name, self.target_system
        )
    }
}

/// Address of a provider: `(namespace, name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAddr {
    pub namespace: String,
    pub name: String,
}

impl ProviderAddr {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, InvalidAddr> {
        let addr = ProviderAddr {
            namespace: namespace.into(),
            name: name.into(),
        };
        addr.validate()?;
        Ok(addr)
    }

    pub fn validate(&self) -> Result<(), InvalidAddr> {
        validate_component(&self.namespace)?;
        validate_component(&self.name)
    }

    pub fn normalize(&self) -> ProviderAddr {
        ProviderAddr {
            namespace: self.namespace.to_lowercase(),
            name: self.name.to_lowercase(),
        }
    }

    /// Canonical metadata path: `providers/<l>/<namespace>/<name>.json`.
    pub fn metadata_path(&self) -> Result<StorePath, StorageError> {
        let n = self.normalize();
        StorePath::from_segments([
            "providers",
            &shard_letter(&n.namespace),
            &n.namespace,
            &format!("{}.json", n.name),
        ])
    }
}

impl PartialEq for ProviderAddr {
    fn eq(&self, other: &Self) -> bool {
        self.namespace.eq_ignore_ascii_case(&other.namespace)
            && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for ProviderAddr {}

impl Hash for ProviderAddr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.to_lowercase().hash(state);
        self.name.to_lowercase().hash(state);
    }
}

impl fmt::Display for ProviderAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_path_sharding() {
        let addr = ModuleAddr::new("OpenTofu", "Test", "AMD64").unwrap();
        assert_eq!(
            addr.metadata_path().unwrap().to_string(),
            "modules/o/opentofu/test/amd64.json"
        );
    }

    #[test]
    fn test_provider_path_case_folding() {
        let addr = ProviderAddr::new("OpenTofu", "Test").unwrap();
        assert_eq!(
            addr.metadata_path().unwrap().to_string(),
            "providers/o/opentofu/test.json"
        );
    }

    #[test]
    fn test_module_equality_compares_all_components() {
        let a = ModuleAddr::new("ns", "one", "aws").unwrap();
        let b = ModuleAddr::new("NS", "ONE", "AWS").unwrap();
        let c = ModuleAddr::new("ns", "two", "aws").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_provider_equality_case_insensitive() {
        let a = ProviderAddr::new("HashiCorp", "AWS").unwrap();
        let b = ProviderAddr::new("hashicorp", "aws").unwrap();
        assert_eq!(a, b);

        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_invalid_components() {
        assert!(ProviderAddr::new("", "aws").is_err());
        assert!(ProviderAddr::new("hashicorp", "a ws").is_err());
        assert!(ModuleAddr::new("ns", "name", "a/b").is_err());
    }
}
