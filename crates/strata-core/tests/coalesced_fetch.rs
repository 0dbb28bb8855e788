//! Concurrent compilations referencing the same parent URIs must share
//! underlying fetches: at most one fetch in flight per distinct reference.

use std::sync::Arc;
use std::time::Duration;

use strata_core::manifest::ManifestLoader;
use strata_core::registry::MemoryRegistry;
use strata_core::resolve::ManifestResolver;

const ENTERPRISE_URI: &str = "registry://acme/enterprise@1";
const DOMAIN_URI: &str = "registry://acme/retail@1";

const ENTERPRISE: &str = "\
api_version: domain.dev/v1
scope: enterprise
metadata: {name: acme, version: 1.0.0, owner: platform@acme.example}
";

const DOMAIN: &str = "\
api_version: domain.dev/v1
scope: domain
metadata: {name: retail, version: 1.0.0, owner: retail@acme.example}
parent_manifest: registry://acme/enterprise@1
";

const PRODUCT: &str = "\
api_version: domain.dev/v1
metadata: {name: orders, version: 1.0.0, owner: orders@acme.example}
parent_manifest: registry://acme/retail@1
";

fn delayed_registry() -> Arc<MemoryRegistry> {
    // The delay widens the concurrency window so every task arrives while
    // the first fetch is still in flight.
    let registry = MemoryRegistry::with_delay(Duration::from_millis(150));
    registry.insert(ENTERPRISE_URI, ENTERPRISE.as_bytes().to_vec());
    registry.insert(DOMAIN_URI, DOMAIN.as_bytes().to_vec());
    Arc::new(registry)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_compilations_share_one_fetch_per_uri() {
    let registry = delayed_registry();
    let resolver = Arc::new(ManifestResolver::new(Arc::clone(&registry)));
    let leaf = ManifestLoader::load(PRODUCT.as_bytes()).unwrap();

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            let leaf = leaf.clone();
            tokio::spawn(async move { resolver.resolve(&leaf).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    // Two concurrent compilations walk the same two parent URIs; the
    // coalescing layer admits exactly one underlying fetch per URI.
    assert_eq!(
        registry.fetch_count(),
        2,
        "expected one fetch per distinct parent URI"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn a_crowd_of_compilations_still_fetches_each_uri_once() {
    let registry = delayed_registry();
    let resolver = Arc::new(ManifestResolver::new(Arc::clone(&registry)));
    let leaf = ManifestLoader::load(PRODUCT.as_bytes()).unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            let leaf = leaf.clone();
            tokio::spawn(async move { resolver.resolve(&leaf).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    assert_eq!(registry.fetch_count(), 2);
}

#[tokio::test]
async fn sequential_compilations_reuse_the_resolution_cache() {
    let registry = Arc::new({
        let r = MemoryRegistry::new();
        r.insert(ENTERPRISE_URI, ENTERPRISE.as_bytes().to_vec());
        r.insert(DOMAIN_URI, DOMAIN.as_bytes().to_vec());
        r
    });
    let resolver = ManifestResolver::new(Arc::clone(&registry));
    let leaf = ManifestLoader::load(PRODUCT.as_bytes()).unwrap();

    let first = resolver.resolve(&leaf).await.unwrap();
    let fetches_after_first = registry.fetch_count();
    let second = resolver.resolve(&leaf).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    // The cache hit still re-walks the chain to compute the digest, but
    // never re-folds; fetch counts only grow by the walk itself.
    assert_eq!(registry.fetch_count(), fetches_after_first * 2);
}
