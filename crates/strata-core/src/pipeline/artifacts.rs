//! The compiled artifacts boundary object.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::manifest::{EffectiveGovernance, ManifestMetadata, PluginCategory};
use crate::namespace::ClaimResult;
use crate::resolve::{ResolvedManifest, TierRef};

/// Schema version of the [`CompiledArtifacts`] contract.
///
/// Additive changes bump MINOR; anything else bumps MAJOR. Downstream
/// generators pin against the major.
pub const ARTIFACTS_SCHEMA_VERSION: &str = "1.0.0";

/// The immutable boundary object a successful compilation hands to
/// downstream generators.
///
/// Produced once per run, never mutated. Everything a generator needs is
/// carried here; generators never reach back into the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledArtifacts {
    /// Version of this contract (see [`ARTIFACTS_SCHEMA_VERSION`]).
    pub artifacts_schema_version: String,

    /// The product identity the artifacts were compiled for.
    pub product: ManifestMetadata,

    /// The resolved governance settings in effect.
    pub governance: EffectiveGovernance,

    /// The effective plugin whitelist per category.
    pub approved_plugins: BTreeMap<PluginCategory, BTreeSet<String>>,

    /// The concrete plugin selected per category.
    pub plugin_selection: BTreeMap<PluginCategory, String>,

    /// The namespace claim outcome, when the product requested one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_claim: Option<ClaimResult>,

    /// The resolved chain, root first, for provenance.
    pub chain: Vec<TierRef>,

    /// Hex SHA-256 digest of the chain the artifacts were compiled from.
    pub chain_digest: String,
}

impl CompiledArtifacts {
    /// Builds the boundary object from a finished resolution and an
    /// optional namespace claim.
    #[must_use]
    pub fn from_resolution(
        resolved: &ResolvedManifest,
        namespace_claim: Option<ClaimResult>,
    ) -> Self {
        Self {
            artifacts_schema_version: ARTIFACTS_SCHEMA_VERSION.to_string(),
            product: resolved.metadata.clone(),
            governance: resolved.governance.clone(),
            approved_plugins: resolved.approved_plugins.clone(),
            plugin_selection: resolved.plugin_selection.clone(),
            namespace_claim,
            chain: resolved.chain.clone(),
            chain_digest: resolved.chain_digest.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{EffectiveGovernance, GovernanceFloors};

    fn resolved() -> ResolvedManifest {
        ResolvedManifest {
            metadata: ManifestMetadata {
                name: "orders".to_string(),
                version: "1.0.0".to_string(),
                owner: "orders@acme.example".to_string(),
                description: None,
            },
            governance: EffectiveGovernance::default(),
            approved_plugins: BTreeMap::new(),
            plugin_selection: BTreeMap::new(),
            approved_products: BTreeSet::new(),
            has_domain_tier: false,
            namespace: Some("retail.orders".to_string()),
            floors: GovernanceFloors {
                data_retention_days: 90,
                sla: Default::default(),
            },
            plugin_findings: Vec::new(),
            chain: Vec::new(),
            chain_digest: "ab".repeat(32),
        }
    }

    #[test]
    fn artifacts_carry_the_resolution_excerpt() {
        let artifacts = CompiledArtifacts::from_resolution(
            &resolved(),
            Some(ClaimResult {
                namespace: "retail.orders".to_string(),
                newly_claimed: true,
            }),
        );
        assert_eq!(artifacts.artifacts_schema_version, ARTIFACTS_SCHEMA_VERSION);
        assert_eq!(artifacts.product.name, "orders");
        assert_eq!(artifacts.chain_digest, "ab".repeat(32));
        assert!(artifacts.namespace_claim.unwrap().newly_claimed);
    }

    #[test]
    fn artifacts_serialize_to_json_for_generators() {
        let artifacts = CompiledArtifacts::from_resolution(&resolved(), None);
        let json = serde_json::to_value(&artifacts).unwrap();
        assert_eq!(json["artifacts_schema_version"], ARTIFACTS_SCHEMA_VERSION);
        assert_eq!(json["product"]["name"], "orders");
        // Absent claims are omitted, not serialized as null.
        assert!(json.get("namespace_claim").is_none());
    }
}
