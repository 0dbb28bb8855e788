//! Parent chain walking with cycle detection.
//!
//! Walking collects the ordered chain `[leaf, domain?, enterprise]` by
//! following `parent_manifest` URIs through the coalescing fetcher. The
//! traversal is a visited-set walk over opaque references: it does not
//! assume a fixed depth, though structural checks (no domain under domain,
//! parents must be scoped, chains terminate at an enterprise root) bound
//! real chains to three tiers.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::manifest::{Manifest, ManifestLoader, SchemaError, TierScope};
use crate::registry::{ArtifactRegistry, CoalescingFetcher, RegistryError};

use super::resolver::ResolutionError;

/// Hard bound on chain length, independent of structural checks.
pub const MAX_CHAIN_DEPTH: usize = 8;

/// One walked tier: the validated manifest plus the URI it was fetched
/// from (`None` for the leaf, which is supplied inline).
#[derive(Debug, Clone)]
pub(crate) struct ChainEntry {
    pub(crate) manifest: Manifest,
    pub(crate) uri: Option<String>,
}

/// Walks the parent chain of `leaf`, returning entries leaf-first.
///
/// Self-contained documents return a single-entry chain without touching
/// the registry.
pub(crate) async fn walk<R: ArtifactRegistry>(
    leaf: &Manifest,
    fetcher: &CoalescingFetcher<R>,
) -> Result<Vec<ChainEntry>, ResolutionError> {
    let mut entries = vec![ChainEntry {
        manifest: leaf.clone(),
        uri: None,
    }];

    if leaf.is_self_contained() {
        trace!(name = %leaf.metadata.name, "self-contained manifest, no chain walk");
        return Ok(entries);
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut next_uri = leaf.parent_manifest.clone();

    while let Some(uri) = next_uri {
        if entries.len() >= MAX_CHAIN_DEPTH {
            return Err(ResolutionError::ChainTooDeep {
                max: MAX_CHAIN_DEPTH,
            });
        }
        if !visited.insert(uri.clone()) {
            return Err(ResolutionError::Cycle { uri });
        }

        let bytes = fetcher.fetch(&uri).await.map_err(|e| match e {
            RegistryError::NotFound { .. } => ResolutionError::MissingParent { uri: uri.clone() },
            other => ResolutionError::Fetch {
                uri: uri.clone(),
                source: other,
            },
        })?;

        let parent = ManifestLoader::load(&bytes).map_err(|e| match e {
            SchemaError::UnsupportedApiVersion { actual, reason } => {
                ResolutionError::IncompatibleVersion {
                    uri: uri.clone(),
                    reason: format!("'{actual}': {reason}"),
                }
            },
            other => ResolutionError::InvalidParent {
                uri: uri.clone(),
                source: other,
            },
        })?;

        // Every fetched parent must be a scoped (enterprise/domain) tier,
        // and domains may not stack under domains.
        match parent.scope {
            None => {
                return Err(ResolutionError::InvalidStructure {
                    subject: uri,
                    reason: "parent manifests must declare 'enterprise' or 'domain' scope"
                        .to_string(),
                });
            },
            Some(TierScope::Domain) => {
                let child_scope = entries
                    .last()
                    .map(|entry| entry.manifest.scope)
                    .unwrap_or(None);
                if child_scope == Some(TierScope::Domain) {
                    return Err(ResolutionError::InvalidStructure {
                        subject: uri,
                        reason: "a domain manifest cannot inherit from another domain"
                            .to_string(),
                    });
                }
            },
            Some(TierScope::Enterprise) => {},
        }

        debug!(
            uri = %uri,
            name = %parent.metadata.name,
            tier = parent.tier_label(),
            "walked parent manifest"
        );
        next_uri = parent.parent_manifest.clone();
        entries.push(ChainEntry {
            manifest: parent,
            uri: Some(uri),
        });
    }

    // A chain that left the leaf must terminate at an enterprise root.
    if let Some(root) = entries.last() {
        if entries.len() > 1 && root.manifest.scope != Some(TierScope::Enterprise) {
            return Err(ResolutionError::InvalidStructure {
                subject: root.manifest.metadata.name.clone(),
                reason: "manifest chains must terminate at an enterprise manifest".to_string(),
            });
        }
    }

    Ok(entries)
}
