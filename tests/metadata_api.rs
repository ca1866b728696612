// End-to-end scenarios against the metadata API over in-memory storage.
use std::sync::Arc;

use tfregistry::metadata::{
    ModuleMetadata, ModuleVersion, ProviderMetadata, ProviderVersion,
};
use tfregistry::{
    MemoryStorage, MetadataError, MetadataStore, ModuleAddr, ProviderAddr, StorageBackend,
    StorePath, VersionNumber,
};

fn store() -> MetadataStore {
    MetadataStore::new(Arc::new(MemoryStorage::new()))
}

fn module_metadata(versions: &[&str]) -> ModuleMetadata {
    ModuleMetadata {
        versions: versions
            .iter()
            .map(|v| ModuleVersion {
                version: VersionNumber::parse(v).unwrap(),
            })
            .collect(),
    }
}

fn provider_metadata(versions: &[&str]) -> ProviderMetadata {
    ProviderMetadata {
        custom_repository: None,
        versions: versions
            .iter()
            .map(|v| ProviderVersion {
                version: VersionNumber::parse(v).unwrap(),
                protocols: vec!["6.0".to_string()],
                shasums_url: format!("https://example.com/{}/SHA256SUMS", v),
                shasums_signature_url: format!("https://example.com/{}/SHA256SUMS.sig", v),
                targets: Vec::new(),
            })
            .collect(),
    }
}

#[tokio::test]
async fn test_module_lifecycle() {
    let store = store();
    let addr = ModuleAddr::new("opentofu", "test", "amd64").unwrap();

    assert!(matches!(
        store.get_module(&addr).await,
        Err(MetadataError::ModuleNotFound { .. })
    ));

    store
        .put_module(&addr, &module_metadata(&["1.10.0", "1.9.0"]))
        .await
        .unwrap();

    let fetched = store.get_module(&addr).await.unwrap();
    assert_eq!(fetched.versions.len(), 2);
    assert_eq!(fetched.versions[0].version.normalized(), "v1.10.0");

    // Addresses are case-insensitive for lookup.
    let shouting = ModuleAddr::new("OpenTofu", "TEST", "AMD64").unwrap();
    assert_eq!(store.get_module(&shouting).await.unwrap(), fetched);

    let listed = store.list_modules_by_namespace("opentofu").await.unwrap();
    assert_eq!(listed, vec![addr.clone()]);
    assert_eq!(store.list_modules().await.unwrap(), vec![addr.clone()]);

    store.delete_module(&addr).await.unwrap();
    assert!(store.list_modules().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_module_storage_is_sharded_by_namespace_letter() {
    let addr = ModuleAddr::new("opentofu", "test", "amd64").unwrap();
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    let shared = MetadataStore::new(storage.clone());
    shared.put_module(&addr, &module_metadata(&["1.0.0"])).await.unwrap();
    assert!(storage
        .file_exists(&StorePath::parse("modules/o/opentofu/test/amd64.json").unwrap())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_provider_alias_resolution() {
    let store = store();
    let canonical = ProviderAddr::new("integrations", "github").unwrap();
    store
        .put_provider(&canonical, &provider_metadata(&["6.2.0"]))
        .await
        .unwrap();

    // hashicorp/github is a provider alias for integrations/github, and
    // opentofu is a namespace alias for hashicorp; both hops resolve.
    for alias in [
        ProviderAddr::new("hashicorp", "github").unwrap(),
        ProviderAddr::new("opentofu", "github").unwrap(),
    ] {
        let resolved = store.get_provider(&alias, true).await.unwrap();
        assert_eq!(resolved.versions.len(), 1);

        // Without resolution the alias address has no record of its own.
        assert!(matches!(
            store.get_provider(&alias, false).await,
            Err(MetadataError::ProviderNotFound { .. })
        ));
    }

    assert_eq!(
        store.provider_canonical_addr(&ProviderAddr::new("OpenTofu", "GitHub").unwrap()),
        canonical
    );
}

#[tokio::test]
async fn test_provider_reverse_aliases() {
    let store = store();
    let canonical = ProviderAddr::new("integrations", "github").unwrap();
    let reverses = store.provider_reverse_aliases(&canonical);
    assert!(reverses.contains(&ProviderAddr::new("hashicorp", "github").unwrap()));
    assert!(reverses.contains(&ProviderAddr::new("opentofu", "github").unwrap()));
    assert!(!reverses.contains(&canonical));
}

#[tokio::test]
async fn test_provider_listing_with_aliases() {
    let store = store();
    store
        .put_provider(
            &ProviderAddr::new("integrations", "github").unwrap(),
            &provider_metadata(&["6.2.0"]),
        )
        .await
        .unwrap();
    store
        .put_provider(
            &ProviderAddr::new("hashicorp", "aws").unwrap(),
            &provider_metadata(&["5.0.0"]),
        )
        .await
        .unwrap();

    let bare = store.list_providers(false).await.unwrap();
    assert_eq!(bare.len(), 2);

    let with_aliases = store.list_providers(true).await.unwrap();
    assert!(with_aliases.contains(&ProviderAddr::new("hashicorp", "github").unwrap()));
    // opentofu mirrors everything stored under hashicorp.
    assert!(with_aliases.contains(&ProviderAddr::new("opentofu", "aws").unwrap()));
    // No alias for a provider whose canonical target is absent.
    assert!(!with_aliases.contains(&ProviderAddr::new("hashicorp", "datadog").unwrap()));
}

#[tokio::test]
async fn test_provider_listing_skips_malformed_entries() {
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    storage
        .put_file(
            &StorePath::parse("providers/b/bad/dotted.name.json").unwrap(),
            vec![],
        )
        .await
        .unwrap();
    let store = MetadataStore::new(storage);
    // "dotted.name" is a valid file name but not a valid provider name;
    // the listing skips it rather than failing.
    assert!(store.list_providers(false).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_signing_key_lifecycle() {
    let store = store();
    let armor = include_str!("fixtures/key1.asc");

    let stored = store
        .put_provider_namespace_key("integrations", armor)
        .await
        .unwrap();
    assert_eq!(stored.key_id, "6A6E6E62EFFD6978");

    let ids = store
        .list_provider_namespace_key_ids("integrations")
        .await
        .unwrap();
    assert_eq!(ids, vec!["6A6E6E62EFFD6978".to_string()]);

    let fetched = store
        .get_provider_namespace_key("integrations", "6a6e6e62effd6978")
        .await
        .unwrap();
    assert_eq!(fetched.ascii_armor, armor);

    assert!(matches!(
        store
            .get_provider_namespace_key("integrations", "0000000000000000")
            .await,
        Err(MetadataError::KeyNotFound { .. })
    ));

    store
        .delete_provider_namespace_key("integrations", "6A6E6E62EFFD6978")
        .await
        .unwrap();
    assert!(store
        .list_provider_namespace_key_ids("integrations")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_malformed_provider_json_reports_path() {
    let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::new());
    storage
        .put_file(
            &StorePath::parse("providers/h/hashicorp/aws.json").unwrap(),
            b"not-json".to_vec(),
        )
        .await
        .unwrap();
    let store = MetadataStore::new(storage);
    match store
        .get_provider(&ProviderAddr::new("hashicorp", "aws").unwrap(), false)
        .await
    {
        Err(MetadataError::Parse { path, .. }) => {
            assert_eq!(path.to_string(), "providers/h/hashicorp/aws.json");
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}
