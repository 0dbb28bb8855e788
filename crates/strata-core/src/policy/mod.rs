//! Policy enforcement: independent validators over a resolved manifest.
//!
//! The enforcer runs six composable validators, each a pure function over
//! the [`crate::resolve::ResolvedManifest`] and the externally supplied
//! transform metadata:
//!
//! - **naming** — transform names against the resolved naming policy
//! - **classification** — sensitive fields must carry classification tags
//!   (and be masked when PII encryption is required)
//! - **quality** — test coverage and documentation gates
//! - **governance** — retention and SLA floors
//! - **schema evolution** — schema diffs under the resolved policy
//! - **approval** — plugin whitelists and domain product approval
//!
//! Validators never block by themselves: they produce immutable
//! [`PolicyViolation`] records, all of them, in one pass. Whether a
//! violation is fatal is the compilation pipeline's decision, gated by the
//! resolved enforcement level (`off` computes for logging only, `warn`
//! reports without blocking, `strict` fails on any error-severity
//! violation).

mod approval;
mod classification;
mod enforcer;
mod evolution;
mod naming;
mod quality;
mod sla;
mod transform;
mod violation;

pub use enforcer::{PolicyEnforcer, MAX_TRANSFORM_RECORDS};
pub use transform::{DeclaredSla, FieldSpec, TransformRecord, TransformSchema};
pub use violation::{PolicyViolation, Severity, ViolationKind};

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for the validator unit suites.

    use std::collections::{BTreeMap, BTreeSet};

    use crate::manifest::{
        EffectiveGovernance, EffectiveSla, GovernanceFloors, ManifestMetadata, NamingPolicy,
    };
    use crate::resolve::ResolvedManifest;

    /// A minimal resolved manifest for a product named `orders`.
    pub(crate) fn resolved() -> ResolvedManifest {
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
            namespace: None,
            floors: GovernanceFloors {
                data_retention_days: EffectiveGovernance::default().data_retention_days,
                sla: EffectiveSla::default(),
            },
            plugin_findings: Vec::new(),
            chain: Vec::new(),
            chain_digest: "0".repeat(64),
        }
    }

    /// Same fixture with an explicit naming policy.
    pub(crate) fn resolved_with_naming(naming: NamingPolicy) -> ResolvedManifest {
        let mut resolved = resolved();
        resolved.governance.naming = naming;
        resolved
    }
}
