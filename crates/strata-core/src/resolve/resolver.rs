//! The resolver: chain walk, fold, digest, and cache orchestration.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::manifest::{
    EffectiveGovernance, GovernanceFloors, Manifest, ManifestMetadata, PluginCategory,
    SchemaError,
};
use crate::registry::{ArtifactRegistry, CoalescingFetcher, RegistryError};

use super::cache::ResolutionCache;
use super::chain::{walk, ChainEntry};
use super::merge::{Fold, ImmutabilityViolation, TierRefInput};

// =============================================================================
// ResolutionError
// =============================================================================

/// Errors that abort chain resolution. Always fatal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolutionError {
    /// The parent chain revisits a manifest reference.
    #[error("manifest chain contains a cycle at '{uri}'")]
    Cycle {
        /// The repeated URI.
        uri: String,
    },

    /// The chain exceeds the hard depth bound.
    #[error("manifest chain exceeds maximum depth of {max} tiers")]
    ChainTooDeep {
        /// The configured maximum.
        max: usize,
    },

    /// A referenced parent does not exist in the registry.
    #[error("parent manifest not found: '{uri}'")]
    MissingParent {
        /// The missing URI.
        uri: String,
    },

    /// The registry failed to deliver a parent.
    #[error("failed to fetch parent manifest '{uri}': {source}")]
    Fetch {
        /// The URI being fetched.
        uri: String,
        /// The underlying registry error.
        #[source]
        source: RegistryError,
    },

    /// A tier declares an API version outside the supported window.
    #[error("parent manifest '{uri}' declares an incompatible api version: {reason}")]
    IncompatibleVersion {
        /// The URI of the offending tier.
        uri: String,
        /// Why the version is incompatible.
        reason: String,
    },

    /// A fetched parent failed schema validation.
    #[error("parent manifest '{uri}' failed schema validation: {source}")]
    InvalidParent {
        /// The URI of the offending tier.
        uri: String,
        /// The underlying schema error.
        #[source]
        source: SchemaError,
    },

    /// The chain is structurally invalid (unscoped parent, domain under
    /// domain, non-enterprise root).
    #[error("invalid chain structure at '{subject}': {reason}")]
    InvalidStructure {
        /// The offending manifest URI or name.
        subject: String,
        /// What is wrong with the structure.
        reason: String,
    },

    /// A child tier attempted to weaken or alter an immutable field.
    /// Fatal regardless of the enforcement level.
    #[error(transparent)]
    Immutability(#[from] ImmutabilityViolation),
}

// =============================================================================
// ResolvedManifest
// =============================================================================

/// One tier of a resolved chain, for diagnostics and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRef {
    /// The manifest name at this tier.
    pub name: String,

    /// The tier label (`enterprise`, `domain`, `product`, `platform`).
    pub tier: String,

    /// The manifest's semantic version.
    pub version: String,

    /// The URI the tier was fetched from; absent for the inline leaf.
    pub uri: Option<String>,
}

/// A plugin declared by a child tier without parent approval.
///
/// Recorded during the fold and emitted as a `plugin-approval` violation by
/// the enforcer, so resolution stays structurally successful while the
/// enforcement level decides fatality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFinding {
    /// The plugin category.
    pub category: PluginCategory,

    /// The unapproved plugin name.
    pub plugin: String,

    /// The manifest name that declared it.
    pub declared_by: String,
}

/// The immutable result of merging a manifest chain.
///
/// Created once per distinct chain and cached by `chain_digest`; never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedManifest {
    /// The leaf manifest's metadata (the product identity).
    pub metadata: ManifestMetadata,

    /// Effective governance after the fold.
    pub governance: EffectiveGovernance,

    /// Effective plugin whitelist per category.
    pub approved_plugins: BTreeMap<PluginCategory, BTreeSet<String>>,

    /// The leaf's concrete plugin choices per category.
    pub plugin_selection: BTreeMap<PluginCategory, String>,

    /// Product names the domain tier permits.
    pub approved_products: BTreeSet<String>,

    /// Whether the chain includes a domain tier (gates product approval).
    pub has_domain_tier: bool,

    /// The catalog namespace the leaf requests, if any.
    pub namespace: Option<String>,

    /// Parent-tier floors, captured before the leaf tier folded.
    pub floors: GovernanceFloors,

    /// Plugins declared without parent approval during the fold.
    pub plugin_findings: Vec<PluginFinding>,

    /// The resolved chain, root first.
    pub chain: Vec<TierRef>,

    /// Hex SHA-256 digest of the canonical chain serialization.
    pub chain_digest: String,
}

impl ResolvedManifest {
    /// Returns true when this resolution came from a single self-contained
    /// document.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.chain.len() == 1
    }
}

// =============================================================================
// Chain digest
// =============================================================================

/// Computes the SHA-256 digest of a chain, root-to-leaf, over the canonical
/// JSON serialization of each tier.
fn chain_digest(chain: &[ChainEntry]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for entry in chain.iter().rev() {
        // Struct fields serialize in declaration order and all maps are
        // B-tree ordered, so this serialization is canonical.
        if let Ok(bytes) = serde_json::to_vec(&entry.manifest) {
            hasher.update(&bytes);
        }
        hasher.update([0x1e]);
    }
    hasher.finalize().into()
}

// =============================================================================
// ManifestResolver
// =============================================================================

/// Resolves manifest chains into [`ResolvedManifest`] values.
///
/// Wraps the registry collaborator in a [`CoalescingFetcher`] and caches
/// results by chain digest. Safe for concurrent use; concurrent
/// resolutions referencing the same parent URI share one fetch.
pub struct ManifestResolver<R> {
    fetcher: CoalescingFetcher<R>,
    cache: ResolutionCache,
}

impl<R: ArtifactRegistry> ManifestResolver<R> {
    /// Creates a resolver with default fetch timeout and cache capacity.
    pub fn new(registry: R) -> Self {
        Self {
            fetcher: CoalescingFetcher::new(registry),
            cache: ResolutionCache::default(),
        }
    }

    /// Creates a resolver with an explicit fetch timeout.
    pub fn with_fetch_timeout(registry: R, timeout: Duration) -> Self {
        Self {
            fetcher: CoalescingFetcher::with_timeout(registry, timeout),
            cache: ResolutionCache::default(),
        }
    }

    /// Resolves the full chain of `leaf` into an effective configuration.
    ///
    /// Deterministic and idempotent: identical chains produce structurally
    /// equal results, and repeat resolutions are served from the cache.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolutionError`] for cycles, missing or invalid
    /// parents, incompatible versions, structural problems, or an
    /// [`ImmutabilityViolation`] during the fold.
    pub async fn resolve(&self, leaf: &Manifest) -> Result<Arc<ResolvedManifest>, ResolutionError> {
        let chain = walk(leaf, &self.fetcher).await?;
        let digest = chain_digest(&chain);

        if let Some(hit) = self.cache.get(&digest).await {
            debug!(
                name = %leaf.metadata.name,
                digest = %hit.chain_digest,
                "resolution served from cache"
            );
            return Ok(hit);
        }

        let resolved = fold_chain(&chain, digest)?;
        info!(
            name = %resolved.metadata.name,
            tiers = resolved.chain.len(),
            digest = %resolved.chain_digest,
            findings = resolved.plugin_findings.len(),
            "manifest chain resolved"
        );
        Ok(self.cache.insert(digest, Arc::new(resolved)).await)
    }
}

/// Folds a walked chain (leaf-first) root-downward into a resolved
/// manifest.
fn fold_chain(
    chain: &[ChainEntry],
    digest: [u8; 32],
) -> Result<ResolvedManifest, ImmutabilityViolation> {
    let mut fold = Fold::new();
    let mut floors: Option<GovernanceFloors> = None;

    let tiers: Vec<&ChainEntry> = chain.iter().rev().collect();
    let last = tiers.len().saturating_sub(1);
    for (index, entry) in tiers.iter().enumerate() {
        // The floors a leaf is judged against are the parent fold; a
        // single-document chain is judged against itself.
        if index == last && tiers.len() > 1 {
            floors = Some(fold.floors());
        }
        fold.apply_tier(&entry.manifest)?;
    }
    let floors = floors.unwrap_or_else(|| fold.floors());

    let leaf = &chain[0].manifest;
    let refs: Vec<TierRefInput> = tiers
        .iter()
        .map(|entry| TierRefInput {
            name: entry.manifest.metadata.name.clone(),
            tier: entry.manifest.tier_label().to_string(),
            version: entry.manifest.metadata.version.clone(),
            uri: entry.uri.clone(),
        })
        .collect();

    Ok(fold.finish(
        leaf.metadata.clone(),
        floors,
        refs,
        hex::encode(digest),
    ))
}

// =============================================================================
// Tests
// =============================================================================
