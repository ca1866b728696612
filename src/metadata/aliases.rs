/// Namespace and provider alias tables.
///
/// Canonicalization takes at most one hop through each table: first the
/// namespace alias, then the provider alias. The default table carries
/// the legacy mappings; a JSON document under `providers/_aliases.json`
/// can replace it.
use std::collections::HashMap;

use serde::Deserialize;

use crate::address::ProviderAddr;
use crate::path::StorePath;
use crate::storage::{StorageBackend, StorageError};

use super::MetadataError;

/// Path of the optional alias seed document.
pub fn aliases_path() -> StorePath {
    StorePath::parse("providers/_aliases.json").expect("static path is valid")
}

#[derive(Debug, Clone)]
pub struct AliasTable {
    namespaces: HashMap<String, String>,
    providers: HashMap<ProviderAddr, ProviderAddr>,
}

/// Legacy provider aliases under the `hashicorp` namespace. The left name
/// resolves to the right address.
const PROVIDER_ALIASES: &[(&str, &str, &str)] = &[
    ("aci", "CiscoDevNet", "aci"),
    ("acme", "vancluever", "acme"),
    ("akamai", "akamai", "akamai"),
    ("alicloud", "aliyun", "alicloud"),
    ("avi", "vmware", "avi"),
    ("aviatrix", "AviatrixSystems", "aviatrix"),
    ("azuredevops", "microsoft", "azuredevops"),
    ("bigip", "F5Networks", "bigip"),
    ("brightbox", "brightbox", "brightbox"),
    ("circonus", "circonus-labs", "circonus"),
    ("cloudflare", "cloudflare", "cloudflare"),
    ("cloudscale", "cloudscale-ch", "cloudscale"),
    ("datadog", "DataDog", "datadog"),
    ("digitalocean", "digitalocean", "digitalocean"),
    ("dme", "DNSMadeEasy", "dme"),
    ("exoscale", "exoscale", "exoscale"),
    ("fastly", "fastly", "fastly"),
    ("flexibleengine", "FlexibleEngineCloud", "flexibleengine"),
    ("github", "integrations", "github"),
    ("gitlab", "gitlabhq", "gitlab"),
    ("grafana", "grafana", "grafana"),
    ("gridscale", "gridscale", "gridscale"),
    ("hcloud", "hetznercloud", "hcloud"),
    ("heroku", "heroku", "heroku"),
    ("huaweicloud", "huaweicloud", "huaweicloud"),
    ("launchdarkly", "launchdarkly", "launchdarkly"),
    ("linode", "linode", "linode"),
    ("logicmonitor", "logicmonitor", "logicmonitor"),
    ("mongodbatlas", "mongodb", "mongodbatlas"),
    ("newrelic", "newrelic", "newrelic"),
    ("ns1", "ns1-terraform", "ns1"),
    ("okta", "okta", "okta"),
    ("opsgenie", "opsgenie", "opsgenie"),
    ("ovh", "ovh", "ovh"),
    ("pagerduty", "PagerDuty", "pagerduty"),
    ("rancher2", "rancher", "rancher2"),
    ("scaleway", "scaleway", "scaleway"),
    ("selectel", "selectel", "selectel"),
    ("signalfx", "splunk-terraform", "signalfx"),
    ("spotinst", "spotinst", "spotinst"),
    ("statuscake", "StatusCakeDev", "statuscake"),
    ("sumologic", "SumoLogic", "sumologic"),
    ("tencentcloud", "tencentcloudstack", "tencentcloud"),
    ("triton", "joyent", "triton"),
    ("ucloud", "ucloud", "ucloud"),
    ("vra7", "vmware", "vra7"),
    ("vultr", "vultr", "vultr"),
    ("yandex", "yandex-cloud", "yandex"),
];

impl Default for AliasTable {
    fn default() -> Self {
        let mut namespaces = HashMap::new();
        namespaces.insert("opentofu".to_string(), "hashicorp".to_string());

        let mut providers = HashMap::new();
        for (name, target_ns, target_name) in PROVIDER_ALIASES {
            providers.insert(
                ProviderAddr {
                    namespace: "hashicorp".to_string(),
                    name: name.to_string(),
                },
                ProviderAddr {
                    namespace: target_ns.to_string(),
                    name: target_name.to_string(),
                },
            );
        }

        AliasTable {
            namespaces,
            providers,
        }
    }
}

#[derive(Deserialize)]
struct AliasDocument {
    #[serde(default)]
    namespaces: HashMap<String, String>,
    #[serde(default)]
    providers: HashMap<String, String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        AliasTable {
            namespaces: HashMap::new(),
            providers: HashMap::new(),
        }
    }

    /// Parse an alias document of the form
    /// `{"namespaces": {"alias": "canonical"},
    ///   "providers": {"ns/name": "ns/name"}}`.
    pub fn from_json(data: &[u8]) -> Result<Self, MetadataError> {
        let doc: AliasDocument =
            serde_json::from_slice(data).map_err(|source| MetadataError::Parse {
                path: aliases_path(),
                source,
            })?;

        let mut providers = HashMap::new();
        for (alias, target) in doc.providers {
            providers.insert(parse_addr(&alias)?, parse_addr(&target)?);
        }

        Ok(AliasTable {
            namespaces: doc
                .namespaces
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
                .collect(),
            providers,
        })
    }

    /// Load the table from `providers/_aliases.json`, falling back to the
    /// built-in seed when the document is absent.
    pub async fn load(storage: &dyn StorageBackend) -> Result<Self, MetadataError> {
        match storage.get_file(&aliases_path()).await {
            Ok(data) => Self::from_json(&data),
            Err(StorageError::FileNotFound(_)) => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// One namespace hop: the canonical namespace for `namespace`, if any.
    pub fn namespace_target(&self, namespace: &str) -> Option<&str> {
        self.namespaces
            .get(&namespace.to_lowercase())
            .map(|s| s.as_str())
    }

    /// One provider hop: the canonical address for `addr`, if any.
    pub fn provider_target(&self, addr: &ProviderAddr) -> Option<&ProviderAddr> {
        self.providers.get(&addr.normalize())
    }

    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.namespaces
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn providers(&self) -> impl Iterator<Item = (&ProviderAddr, &ProviderAddr)> {
        self.providers.iter()
    }
}

fn parse_addr(input: &str) -> Result<ProviderAddr, MetadataError> {
    let (namespace, name) = input.split_once('/').ok_or_else(|| {
        MetadataError::InvalidAddr(crate::address::InvalidAddr {
            value: input.to_string(),
            reason: "expected namespace/name".to_string(),
        })
    })?;
    Ok(ProviderAddr::new(namespace, name)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespace_alias() {
        let table = AliasTable::default();
        assert_eq!(table.namespace_target("opentofu"), Some("hashicorp"));
        assert_eq!(table.namespace_target("OpenTofu"), Some("hashicorp"));
        assert_eq!(table.namespace_target("hashicorp"), None);
    }

    #[test]
    fn test_default_provider_alias() {
        let table = AliasTable::default();
        let github = ProviderAddr::new("hashicorp", "github").unwrap();
        let target = table.provider_target(&github).unwrap();
        assert_eq!(target.namespace, "integrations");
        assert_eq!(target.name, "github");
        assert!(table
            .provider_target(&ProviderAddr::new("hashicorp", "aws").unwrap())
            .is_none());
    }

    #[test]
    fn test_from_json() {
        let table = AliasTable::from_json(
            br#"{"namespaces": {"OldCo": "newco"},
                 "providers": {"newco/thing": "acme/thing"}}"#,
        )
        .unwrap();
        assert_eq!(table.namespace_target("oldco"), Some("newco"));
        let thing = ProviderAddr::new("newco", "thing").unwrap();
        assert_eq!(table.provider_target(&thing).unwrap().namespace, "acme");
    }

    #[test]
    fn test_from_json_rejects_malformed_addr() {
        assert!(AliasTable::from_json(br#"{"providers": {"noslash": "acme/thing"}}"#).is_err());
    }
}
