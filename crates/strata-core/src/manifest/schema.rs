//! Typed manifest document model.
//!
//! These types are the deserialization target for a single manifest
//! document. Collection fields use `BTreeMap`/`BTreeSet` so serialization
//! is deterministic, which the chain digest in [`crate::resolve`] relies on.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::governance::GovernanceSpec;

// =============================================================================
// Limits
// =============================================================================

/// Maximum length for names, owners, and namespace strings.
pub const MAX_NAME_LENGTH: usize = 256;

/// Maximum number of plugins a tier may list per category.
pub const MAX_PLUGINS_PER_CATEGORY: usize = 64;

/// Maximum number of sensitive-field patterns a tier may declare.
pub const MAX_SENSITIVE_PATTERNS: usize = 128;

/// Maximum number of custom governance rules a tier may declare.
pub const MAX_CUSTOM_RULES: usize = 128;

// =============================================================================
// TierScope
// =============================================================================

/// The tier a manifest document is authored at.
///
/// A document with no scope is either a self-contained (two-tier) manifest
/// or, when it references a parent, the product leaf of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TierScope {
    /// The root tier. Must not reference a parent.
    Enterprise,

    /// The middle tier. Must reference an enterprise parent.
    Domain,
}

impl TierScope {
    /// Returns the wire name for this scope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enterprise => "enterprise",
            Self::Domain => "domain",
        }
    }

    /// Parses a scope string; unknown values return `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "enterprise" => Some(Self::Enterprise),
            "domain" => Some(Self::Domain),
            _ => None,
        }
    }
}

impl std::fmt::Display for TierScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// PluginCategory
// =============================================================================

/// The plugin categories a platform configuration governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PluginCategory {
    /// Query/compute engines (e.g. `duckdb`, `snowflake`).
    Compute,

    /// Pipeline orchestrators.
    Orchestrator,

    /// Catalog backends.
    Catalog,

    /// Ingestion connectors.
    Ingestion,

    /// Data-quality toolchains.
    Quality,
}

impl PluginCategory {
    /// Returns the wire name for this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compute => "compute",
            Self::Orchestrator => "orchestrator",
            Self::Catalog => "catalog",
            Self::Ingestion => "ingestion",
            Self::Quality => "quality",
        }
    }
}

impl std::fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ManifestMetadata
// =============================================================================

/// Identifying metadata carried by every manifest document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// The manifest (and, at the leaf, product) name.
    pub name: String,

    /// Semantic version of the document (`MAJOR.MINOR.PATCH`).
    pub version: String,

    /// Owning team or contact.
    pub owner: String,

    /// Optional human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Manifest
// =============================================================================

/// One validated configuration document at one tier.
///
/// Produced by [`super::ManifestLoader`]; schema-valid but unaware of its
/// parents. Chain semantics (cycle detection, merging, immutability) live
/// in [`crate::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// The manifest dialect and major version (`domain.dev/v1`).
    pub api_version: String,

    /// The authoring tier; absent for two-tier and product-leaf documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<TierScope>,

    /// Identifying metadata.
    pub metadata: ManifestMetadata,

    /// Opaque URI of the parent manifest artifact, when part of a chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_manifest: Option<String>,

    /// Plugin whitelist per category (enterprise/domain tiers).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub approved_plugins: BTreeMap<PluginCategory, BTreeSet<String>>,

    /// The concrete plugin this document selects per category (leaf tiers).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugin_selection: BTreeMap<PluginCategory, String>,

    /// Product names permitted to compile under this domain (domain tier).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub approved_products: BTreeSet<String>,

    /// Governance settings declared at this tier.
    #[serde(default)]
    pub governance: GovernanceSpec,

    /// Catalog namespace this product requests (leaf tiers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Manifest {
    /// Returns true when this document resolves to itself: no scope and no
    /// parent reference (two-tier mode).
    #[must_use]
    pub fn is_self_contained(&self) -> bool {
        self.scope.is_none() && self.parent_manifest.is_none()
    }

    /// Returns a short label for diagnostics: the scope name, or the tier
    /// position implied by the parent reference.
    #[must_use]
    pub fn tier_label(&self) -> &'static str {
        match self.scope {
            Some(TierScope::Enterprise) => "enterprise",
            Some(TierScope::Domain) => "domain",
            None if self.parent_manifest.is_some() => "product",
            None => "platform",
        }
    }
}
