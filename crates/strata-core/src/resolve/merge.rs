//! Per-field merge strategies and the chain fold.
//!
//! The fold is data-driven: [`FIELD_STRATEGIES`] maps each merged field
//! path to its [`MergeStrategy`], and the fold consults the table through
//! [`strategy_for`] rather than hard-coding behavior per field. Adding a
//! merged field means adding a table row and one fold call.
//!
//! `approved_plugins` is the one field outside the table: it follows the
//! dedicated subset rule (child declarations must already appear in the
//! folded parent whitelist; strays are recorded as findings for the
//! enforcer rather than aborting the fold).
//!
//! # Immutability
//!
//! STRENGTHEN fields ride the total orders defined on the governance
//! enums (`off < warn < strict`, `optional < required`,
//! `disabled < enabled`), so "child may only preserve or strengthen" is a
//! single comparison. Weakening, or altering a FORBID field, raises
//! [`ImmutabilityViolation`] — fatal regardless of enforcement level,
//! since it is an attempt to bypass parent security governance.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::manifest::{
    AuditLogging, EffectiveGovernance, EffectiveSla, EnforcementLevel, GovernanceFloors,
    GovernanceRule, Manifest, ManifestMetadata, NamingPolicy, PiiEncryption, PluginCategory,
    QualityGates, SchemaEvolutionPolicy, TierScope, ApiVersion, defaults,
    DEFAULT_SENSITIVE_PATTERNS,
};

use super::resolver::PluginFinding;

// =============================================================================
// MergeStrategy table
// =============================================================================

/// How a child tier's declared value combines with the folded parent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MergeStrategy {
    /// Child value replaces the parent value.
    Override,

    /// Child value is unioned with the parent value.
    Extend,

    /// Child must not alter the field at all.
    Forbid,

    /// Child value must be equal to or stronger than the parent value on
    /// the field's total order.
    Strengthen,
}

/// Declarative field-path → strategy table consulted by the fold.
pub const FIELD_STRATEGIES: &[(&str, MergeStrategy)] = &[
    ("api_version", MergeStrategy::Forbid),
    ("governance.data_retention_days", MergeStrategy::Override),
    ("governance.pii_encryption", MergeStrategy::Strengthen),
    ("governance.audit_logging", MergeStrategy::Strengthen),
    (
        "governance.policy_enforcement_level",
        MergeStrategy::Strengthen,
    ),
    ("governance.schema_evolution", MergeStrategy::Override),
    ("governance.sla.max_freshness_minutes", MergeStrategy::Override),
    (
        "governance.sla.min_availability_percent",
        MergeStrategy::Override,
    ),
    ("governance.naming", MergeStrategy::Override),
    (
        "governance.classification.sensitive_field_patterns",
        MergeStrategy::Extend,
    ),
    ("governance.quality", MergeStrategy::Override),
    ("governance.custom_rules", MergeStrategy::Extend),
    ("plugin_selection", MergeStrategy::Override),
    ("approved_products", MergeStrategy::Override),
    ("namespace", MergeStrategy::Override),
];

/// Looks up the merge strategy for a field path.
///
/// Unlisted fields default to OVERRIDE, which is the least surprising
/// behavior for a newly added field; security-relevant fields must be
/// listed explicitly.
#[must_use]
pub fn strategy_for(field: &str) -> MergeStrategy {
    FIELD_STRATEGIES
        .iter()
        .find(|(path, _)| *path == field)
        .map_or(MergeStrategy::Override, |(_, strategy)| *strategy)
}

// =============================================================================
// ImmutabilityViolation
// =============================================================================

/// A child tier attempted to weaken or alter an immutable parent field.
///
/// Always fatal, independent of the enforcement level: routed as a
/// [`super::ResolutionError`] by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ImmutabilityViolation {
    /// A security-sensitive field was given a strictly weaker value.
    #[error(
        "security field '{field}' may not be weakened: tier '{tier}' declares \
         '{child}' but the parent chain requires '{parent}'"
    )]
    Weakened {
        /// The field path.
        field: String,
        /// The tier (manifest name) that attempted the change.
        tier: String,
        /// The folded parent value.
        parent: String,
        /// The declared child value.
        child: String,
    },

    /// An immutable field was altered.
    #[error(
        "immutable field '{field}' may not be altered: tier '{tier}' declares \
         '{child}' but the parent chain fixed '{parent}'"
    )]
    Altered {
        /// The field path.
        field: String,
        /// The tier (manifest name) that attempted the change.
        tier: String,
        /// The folded parent value.
        parent: String,
        /// The declared child value.
        child: String,
    },
}

impl ImmutabilityViolation {
    /// The path of the violated field.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Weakened { field, .. } | Self::Altered { field, .. } => field,
        }
    }
}

// =============================================================================
// Merge helpers
// =============================================================================

/// Merges a scalar field under OVERRIDE or FORBID semantics per the table.
fn merge_field<T>(
    field: &'static str,
    tier: &str,
    acc: &mut Option<T>,
    declared: Option<T>,
) -> Result<(), ImmutabilityViolation>
where
    T: PartialEq + std::fmt::Debug,
{
    let Some(child) = declared else {
        return Ok(());
    };
    match strategy_for(field) {
        MergeStrategy::Forbid => match acc.as_ref() {
            Some(parent) if *parent != child => Err(ImmutabilityViolation::Altered {
                field: field.to_string(),
                tier: tier.to_string(),
                parent: format!("{parent:?}"),
                child: format!("{child:?}"),
            }),
            Some(_) => Ok(()),
            None => {
                *acc = Some(child);
                Ok(())
            },
        },
        // Extend and Strengthen fields use the specialized helpers; a table
        // edit that routes one here degrades to Override rather than
        // silently dropping the declaration.
        _ => {
            *acc = Some(child);
            Ok(())
        },
    }
}

/// Merges an ordered field under STRENGTHEN (or OVERRIDE) semantics per
/// the table.
fn merge_ranked<T>(
    field: &'static str,
    tier: &str,
    acc: &mut Option<T>,
    declared: Option<T>,
) -> Result<(), ImmutabilityViolation>
where
    T: Copy + Ord + std::fmt::Display,
{
    let Some(child) = declared else {
        return Ok(());
    };
    match strategy_for(field) {
        MergeStrategy::Strengthen => match acc.as_ref() {
            Some(parent) if child < *parent => Err(ImmutabilityViolation::Weakened {
                field: field.to_string(),
                tier: tier.to_string(),
                parent: parent.to_string(),
                child: child.to_string(),
            }),
            _ => {
                *acc = Some(child);
                Ok(())
            },
        },
        _ => {
            *acc = Some(child);
            Ok(())
        },
    }
}

/// Unions a list field, preserving fold order and deduplicating by key.
fn merge_extend<T, K, F>(acc: &mut Vec<T>, declared: &[T], key: F)
where
    T: Clone,
    K: PartialEq,
    F: Fn(&T) -> K,
{
    for item in declared {
        if !acc.iter().any(|existing| key(existing) == key(item)) {
            acc.push(item.clone());
        }
    }
}

// =============================================================================
// Fold
// =============================================================================

/// Working state of a chain fold, applied tier by tier from the root.
#[derive(Debug, Default)]
pub(crate) struct Fold {
    api_major: Option<u32>,
    data_retention_days: Option<u32>,
    pii_encryption: Option<PiiEncryption>,
    audit_logging: Option<AuditLogging>,
    policy_enforcement_level: Option<EnforcementLevel>,
    schema_evolution: Option<SchemaEvolutionPolicy>,
    max_freshness_minutes: Option<u32>,
    min_availability_percent: Option<u8>,
    naming: Option<NamingPolicy>,
    sensitive_patterns: Vec<String>,
    quality: Option<QualityGates>,
    custom_rules: Vec<GovernanceRule>,
    approved_plugins: BTreeMap<PluginCategory, BTreeSet<String>>,
    plugins_constrained: bool,
    plugin_selection: BTreeMap<PluginCategory, String>,
    approved_products: BTreeSet<String>,
    has_domain_tier: bool,
    namespace: Option<String>,
    findings: Vec<PluginFinding>,
}

impl Fold {
    pub(crate) fn new() -> Self {
        Self {
            sensitive_patterns: DEFAULT_SENSITIVE_PATTERNS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            ..Self::default()
        }
    }

    /// Applies one tier's declarations on top of the state folded so far.
    pub(crate) fn apply_tier(&mut self, manifest: &Manifest) -> Result<(), ImmutabilityViolation> {
        let tier = manifest.metadata.name.clone();
        let governance = &manifest.governance;

        let declared_major = ApiVersion::parse(&manifest.api_version)
            .map(|v| v.major)
            .ok();
        merge_field("api_version", &tier, &mut self.api_major, declared_major)?;

        merge_field(
            "governance.data_retention_days",
            &tier,
            &mut self.data_retention_days,
            governance.data_retention_days,
        )?;
        merge_ranked(
            "governance.pii_encryption",
            &tier,
            &mut self.pii_encryption,
            governance.pii_encryption,
        )?;
        merge_ranked(
            "governance.audit_logging",
            &tier,
            &mut self.audit_logging,
            governance.audit_logging,
        )?;
        merge_ranked(
            "governance.policy_enforcement_level",
            &tier,
            &mut self.policy_enforcement_level,
            governance.policy_enforcement_level,
        )?;
        merge_field(
            "governance.schema_evolution",
            &tier,
            &mut self.schema_evolution,
            governance.schema_evolution,
        )?;
        merge_field(
            "governance.sla.max_freshness_minutes",
            &tier,
            &mut self.max_freshness_minutes,
            governance.sla.max_freshness_minutes,
        )?;
        merge_field(
            "governance.sla.min_availability_percent",
            &tier,
            &mut self.min_availability_percent,
            governance.sla.min_availability_percent,
        )?;
        merge_field(
            "governance.naming",
            &tier,
            &mut self.naming,
            governance.naming.clone(),
        )?;
        merge_field(
            "governance.quality",
            &tier,
            &mut self.quality,
            governance.quality,
        )?;
        merge_field("namespace", &tier, &mut self.namespace, manifest.namespace.clone())?;

        merge_extend(
            &mut self.sensitive_patterns,
            &governance.classification.sensitive_field_patterns,
            |p| p.clone(),
        );
        merge_extend(&mut self.custom_rules, &governance.custom_rules, |r| {
            r.id.clone()
        });

        self.fold_plugins(manifest);

        for (category, plugin) in &manifest.plugin_selection {
            self.plugin_selection.insert(*category, plugin.clone());
        }
        if !manifest.approved_products.is_empty() {
            self.approved_products = manifest.approved_products.clone();
        }
        if manifest.scope == Some(TierScope::Domain) {
            self.has_domain_tier = true;
        }

        Ok(())
    }

    /// Applies the subset rule for `approved_plugins`.
    ///
    /// The first tier that authors a whitelist constrains every tier below
    /// it: later declarations narrow to the intersection, and strays are
    /// recorded as findings for the enforcer.
    fn fold_plugins(&mut self, manifest: &Manifest) {
        let declared = &manifest.approved_plugins;
        if declared.is_empty() {
            return;
        }
        if !self.plugins_constrained {
            self.approved_plugins = declared.clone();
            self.plugins_constrained = true;
            return;
        }
        for (category, plugins) in declared {
            let parent = self
                .approved_plugins
                .get(category)
                .cloned()
                .unwrap_or_default();
            let mut effective = BTreeSet::new();
            for plugin in plugins {
                if parent.contains(plugin) {
                    effective.insert(plugin.clone());
                } else {
                    self.findings.push(PluginFinding {
                        category: *category,
                        plugin: plugin.clone(),
                        declared_by: manifest.metadata.name.clone(),
                    });
                }
            }
            self.approved_plugins.insert(*category, effective);
        }
    }

    /// Captures the parent-tier floors before the leaf tier folds.
    pub(crate) fn floors(&self) -> GovernanceFloors {
        GovernanceFloors {
            data_retention_days: self
                .data_retention_days
                .unwrap_or(defaults::DATA_RETENTION_DAYS),
            sla: EffectiveSla {
                max_freshness_minutes: self
                    .max_freshness_minutes
                    .unwrap_or(defaults::MAX_FRESHNESS_MINUTES),
                min_availability_percent: self
                    .min_availability_percent
                    .unwrap_or(defaults::MIN_AVAILABILITY_PERCENT),
            },
        }
    }

    /// Finishes the fold, applying defaults where no tier declared a value.
    pub(crate) fn finish(
        self,
        leaf_metadata: ManifestMetadata,
        floors: GovernanceFloors,
        chain: Vec<TierRefInput>,
        chain_digest: String,
    ) -> super::ResolvedManifest {
        super::ResolvedManifest {
            metadata: leaf_metadata,
            governance: EffectiveGovernance {
                data_retention_days: self
                    .data_retention_days
                    .unwrap_or(defaults::DATA_RETENTION_DAYS),
                pii_encryption: self.pii_encryption.unwrap_or_default(),
                audit_logging: self.audit_logging.unwrap_or_default(),
                policy_enforcement_level: self.policy_enforcement_level.unwrap_or_default(),
                schema_evolution: self.schema_evolution.unwrap_or_default(),
                sla: EffectiveSla {
                    max_freshness_minutes: self
                        .max_freshness_minutes
                        .unwrap_or(defaults::MAX_FRESHNESS_MINUTES),
                    min_availability_percent: self
                        .min_availability_percent
                        .unwrap_or(defaults::MIN_AVAILABILITY_PERCENT),
                },
                naming: self.naming.unwrap_or_default(),
                sensitive_field_patterns: self.sensitive_patterns,
                quality: self.quality.unwrap_or_default(),
                custom_rules: self.custom_rules,
            },
            approved_plugins: self.approved_plugins,
            plugin_selection: self.plugin_selection,
            approved_products: self.approved_products,
            has_domain_tier: self.has_domain_tier,
            namespace: self.namespace,
            floors,
            plugin_findings: self.findings,
            chain: chain
                .into_iter()
                .map(|t| super::TierRef {
                    name: t.name,
                    tier: t.tier,
                    version: t.version,
                    uri: t.uri,
                })
                .collect(),
            chain_digest,
        }
    }
}

/// Minimal tier description handed from the resolver to [`Fold::finish`].
pub(crate) struct TierRefInput {
    pub(crate) name: String,
    pub(crate) tier: String,
    pub(crate) version: String,
    pub(crate) uri: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{GovernanceSpec, ManifestMetadata};

    fn manifest(name: &str, scope: Option<TierScope>) -> Manifest {
        Manifest {
            api_version: "domain.dev/v1".to_string(),
            scope,
            metadata: ManifestMetadata {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                owner: "owner@acme.example".to_string(),
                description: None,
            },
            parent_manifest: None,
            approved_plugins: BTreeMap::new(),
            plugin_selection: BTreeMap::new(),
            approved_products: BTreeSet::new(),
            governance: GovernanceSpec::default(),
            namespace: None,
        }
    }

    #[test]
    fn strategy_table_covers_security_fields() {
        assert_eq!(
            strategy_for("governance.pii_encryption"),
            MergeStrategy::Strengthen
        );
        assert_eq!(
            strategy_for("governance.audit_logging"),
            MergeStrategy::Strengthen
        );
        assert_eq!(
            strategy_for("governance.policy_enforcement_level"),
            MergeStrategy::Strengthen
        );
        assert_eq!(strategy_for("api_version"), MergeStrategy::Forbid);
        // Unlisted fields fall back to override.
        assert_eq!(strategy_for("governance.unlisted"), MergeStrategy::Override);
    }

    #[test]
    fn strengthening_is_accepted() {
        let mut fold = Fold::new();
        let mut parent = manifest("enterprise", Some(TierScope::Enterprise));
        parent.governance.policy_enforcement_level = Some(EnforcementLevel::Warn);
        fold.apply_tier(&parent).unwrap();

        let mut child = manifest("retail", Some(TierScope::Domain));
        child.governance.policy_enforcement_level = Some(EnforcementLevel::Strict);
        fold.apply_tier(&child).unwrap();

        assert_eq!(
            fold.policy_enforcement_level,
            Some(EnforcementLevel::Strict)
        );
    }

    #[test]
    fn equal_value_is_accepted() {
        let mut fold = Fold::new();
        let mut parent = manifest("enterprise", Some(TierScope::Enterprise));
        parent.governance.pii_encryption = Some(PiiEncryption::Required);
        fold.apply_tier(&parent).unwrap();

        let mut child = manifest("retail", Some(TierScope::Domain));
        child.governance.pii_encryption = Some(PiiEncryption::Required);
        assert!(fold.apply_tier(&child).is_ok());
    }

    #[test]
    fn weakening_enforcement_level_rejected() {
        let mut fold = Fold::new();
        let mut parent = manifest("enterprise", Some(TierScope::Enterprise));
        parent.governance.policy_enforcement_level = Some(EnforcementLevel::Strict);
        fold.apply_tier(&parent).unwrap();

        let mut child = manifest("retail", Some(TierScope::Domain));
        child.governance.policy_enforcement_level = Some(EnforcementLevel::Off);
        let err = fold.apply_tier(&child).unwrap_err();
        assert!(matches!(
            err,
            ImmutabilityViolation::Weakened { ref field, .. }
                if field == "governance.policy_enforcement_level"
        ));
    }

    #[test]
    fn weakening_audit_logging_rejected() {
        let mut fold = Fold::new();
        let mut parent = manifest("enterprise", Some(TierScope::Enterprise));
        parent.governance.audit_logging = Some(AuditLogging::Enabled);
        fold.apply_tier(&parent).unwrap();

        let mut child = manifest("retail", Some(TierScope::Domain));
        child.governance.audit_logging = Some(AuditLogging::Disabled);
        assert!(fold.apply_tier(&child).is_err());
    }

    #[test]
    fn silent_child_inherits_parent_strength() {
        let mut fold = Fold::new();
        let mut parent = manifest("enterprise", Some(TierScope::Enterprise));
        parent.governance.pii_encryption = Some(PiiEncryption::Required);
        fold.apply_tier(&parent).unwrap();

        // Child says nothing; the folded value must survive.
        let child = manifest("retail", Some(TierScope::Domain));
        fold.apply_tier(&child).unwrap();
        assert_eq!(fold.pii_encryption, Some(PiiEncryption::Required));
    }

    #[test]
    fn api_version_major_is_forbid() {
        let mut fold = Fold::new();
        fold.apply_tier(&manifest("enterprise", Some(TierScope::Enterprise)))
            .unwrap();

        let mut child = manifest("retail", Some(TierScope::Domain));
        child.api_version = "domain.dev/v2".to_string();
        let err = fold.apply_tier(&child).unwrap_err();
        assert!(matches!(
            err,
            ImmutabilityViolation::Altered { ref field, .. } if field == "api_version"
        ));
    }

    #[test]
    fn plugin_subset_narrows_and_records_findings() {
        let mut fold = Fold::new();

        let mut enterprise = manifest("enterprise", Some(TierScope::Enterprise));
        enterprise.approved_plugins.insert(
            PluginCategory::Compute,
            ["duckdb", "snowflake"].iter().map(|s| s.to_string()).collect(),
        );
        fold.apply_tier(&enterprise).unwrap();

        let mut domain = manifest("retail", Some(TierScope::Domain));
        domain.approved_plugins.insert(
            PluginCategory::Compute,
            ["duckdb", "spark"].iter().map(|s| s.to_string()).collect(),
        );
        fold.apply_tier(&domain).unwrap();

        let compute = &fold.approved_plugins[&PluginCategory::Compute];
        assert!(compute.contains("duckdb"));
        assert!(!compute.contains("spark"));
        assert_eq!(fold.findings.len(), 1);
        assert_eq!(fold.findings[0].plugin, "spark");
        assert_eq!(fold.findings[0].declared_by, "retail");
    }

    #[test]
    fn plugin_category_authored_fresh_below_root_is_a_finding() {
        let mut fold = Fold::new();

        let mut enterprise = manifest("enterprise", Some(TierScope::Enterprise));
        enterprise.approved_plugins.insert(
            PluginCategory::Compute,
            ["duckdb"].iter().map(|s| s.to_string()).collect(),
        );
        fold.apply_tier(&enterprise).unwrap();

        let mut domain = manifest("retail", Some(TierScope::Domain));
        domain.approved_plugins.insert(
            PluginCategory::Orchestrator,
            ["airflow"].iter().map(|s| s.to_string()).collect(),
        );
        fold.apply_tier(&domain).unwrap();

        assert_eq!(fold.findings.len(), 1);
        assert_eq!(fold.findings[0].category, PluginCategory::Orchestrator);
    }

    #[test]
    fn extend_deduplicates_patterns_and_rules() {
        let mut fold = Fold::new();
        let baseline = fold.sensitive_patterns.len();

        let mut tier = manifest("enterprise", Some(TierScope::Enterprise));
        tier.governance.classification.sensitive_field_patterns =
            vec!["email".to_string(), "iban".to_string()];
        tier.governance.custom_rules = vec![GovernanceRule {
            id: "GOV-001".to_string(),
            description: None,
        }];
        fold.apply_tier(&tier).unwrap();

        // "email" is already seeded; only "iban" is new.
        assert_eq!(fold.sensitive_patterns.len(), baseline + 1);

        let mut child = manifest("retail", Some(TierScope::Domain));
        child.governance.custom_rules = vec![
            GovernanceRule {
                id: "GOV-001".to_string(),
                description: Some("duplicate".to_string()),
            },
            GovernanceRule {
                id: "GOV-002".to_string(),
                description: None,
            },
        ];
        fold.apply_tier(&child).unwrap();
        assert_eq!(fold.custom_rules.len(), 2);
    }

    #[test]
    fn override_fields_take_last_declared_value() {
        let mut fold = Fold::new();

        let mut parent = manifest("enterprise", Some(TierScope::Enterprise));
        parent.governance.data_retention_days = Some(365);
        parent.governance.schema_evolution = Some(SchemaEvolutionPolicy::Strict);
        fold.apply_tier(&parent).unwrap();

        let mut child = manifest("retail", Some(TierScope::Domain));
        child.governance.data_retention_days = Some(400);
        child.governance.schema_evolution = Some(SchemaEvolutionPolicy::Additive);
        fold.apply_tier(&child).unwrap();

        assert_eq!(fold.data_retention_days, Some(400));
        assert_eq!(
            fold.schema_evolution,
            Some(SchemaEvolutionPolicy::Additive)
        );
    }

    #[test]
    fn floors_reflect_parent_fold() {
        let mut fold = Fold::new();
        let mut parent = manifest("enterprise", Some(TierScope::Enterprise));
        parent.governance.data_retention_days = Some(400);
        fold.apply_tier(&parent).unwrap();

        let floors = fold.floors();
        assert_eq!(floors.data_retention_days, 400);
        assert_eq!(
            floors.sla.max_freshness_minutes,
            defaults::MAX_FRESHNESS_MINUTES
        );
    }
}
