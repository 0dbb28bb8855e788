//! Governance policy model: ordered security levels and tier-scoped specs.
//!
//! Governance settings come in two shapes:
//!
//! - [`GovernanceSpec`] is the *document* form: every field is optional so
//!   the merge fold can distinguish "tier declares a value" from "tier is
//!   silent and inherits".
//! - [`EffectiveGovernance`] is the *resolved* form produced by folding a
//!   chain: every field is concrete, with documented defaults applied where
//!   no tier declared a value.
//!
//! # Ordering
//!
//! The three security-sensitive settings form total orders used by the
//! strengthen-only merge rule:
//!
//! - [`EnforcementLevel`]: `Off < Warn < Strict`
//! - [`PiiEncryption`]: `Optional < Required`
//! - [`AuditLogging`]: `Disabled < Enabled`
//!
//! Each `Ord` implementation compares explicit ranks, not enum ordinals, so
//! reordering variants cannot silently change the ratchet direction.

use serde::{Deserialize, Serialize};

// =============================================================================
// EnforcementLevel
// =============================================================================

/// How policy violations affect a compilation run.
///
/// # Ordering
///
/// `Off < Warn < Strict`. A child tier may only keep or raise the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum EnforcementLevel {
    /// Violations are computed and logged, never reported as blocking.
    Off,

    /// Violations are reported but never block compilation.
    #[default]
    Warn,

    /// Any error-severity violation fails the compilation.
    Strict,
}

impl EnforcementLevel {
    /// Returns the numeric rank of this level. Higher ranks are stricter.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Warn => 1,
            Self::Strict => 2,
        }
    }

    /// Returns true if error-severity violations are fatal at this level.
    #[must_use]
    pub const fn blocks_on_error(self) -> bool {
        matches!(self, Self::Strict)
    }

    /// Returns the wire name for this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Warn => "warn",
            Self::Strict => "strict",
        }
    }
}

impl std::fmt::Display for EnforcementLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PartialOrd for EnforcementLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EnforcementLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

// =============================================================================
// PiiEncryption
// =============================================================================

/// Whether fields classified as PII must be encrypted or masked downstream.
///
/// # Ordering
///
/// `Optional < Required`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PiiEncryption {
    /// PII handling is recommended but not enforced.
    #[default]
    Optional,

    /// PII fields must be encrypted or masked downstream.
    Required,
}

impl PiiEncryption {
    /// Returns the numeric rank of this setting. Higher ranks are stricter.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Optional => 0,
            Self::Required => 1,
        }
    }

    /// Returns the wire name for this setting.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Optional => "optional",
            Self::Required => "required",
        }
    }
}

impl std::fmt::Display for PiiEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PartialOrd for PiiEncryption {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PiiEncryption {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

// =============================================================================
// AuditLogging
// =============================================================================

/// Whether audit logging is mandated for pipelines under this configuration.
///
/// # Ordering
///
/// `Disabled < Enabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum AuditLogging {
    /// Audit logging is not mandated.
    #[default]
    Disabled,

    /// Audit logging is mandated.
    Enabled,
}

impl AuditLogging {
    /// Returns the numeric rank of this setting. Higher ranks are stricter.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::Enabled => 1,
        }
    }

    /// Returns the wire name for this setting.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Enabled => "enabled",
        }
    }
}

impl std::fmt::Display for AuditLogging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PartialOrd for AuditLogging {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AuditLogging {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

// =============================================================================
// SchemaEvolutionPolicy
// =============================================================================

/// How transform schemas may change between published versions.
///
/// Not part of the security ratchet: a child tier replaces the parent's
/// value outright (OVERRIDE merge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SchemaEvolutionPolicy {
    /// No schema change is allowed between published versions.
    Strict,

    /// Only new optional fields may be added.
    #[default]
    Additive,

    /// Schema changes are unrestricted.
    Any,
}

impl SchemaEvolutionPolicy {
    /// Returns the wire name for this policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Additive => "additive",
            Self::Any => "any",
        }
    }
}

impl std::fmt::Display for SchemaEvolutionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// NamingPolicy
// =============================================================================

/// Transform naming enforcement mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
#[non_exhaustive]
pub enum NamingPolicy {
    /// Built-in medallion prefixes: `bronze_`, `silver_`, `gold_`.
    Medallion,

    /// A custom anchored regular expression every transform name must match.
    Pattern {
        /// The regular expression source.
        pattern: String,
    },

    /// Naming is not checked.
    #[default]
    Disabled,
}

// =============================================================================
// Classification, quality, SLA, custom rules
// =============================================================================

/// Sensitive-field patterns seeded into every resolved configuration.
///
/// Tier declarations extend this list; they never replace it.
pub const DEFAULT_SENSITIVE_PATTERNS: &[&str] = &[
    "email",
    "ssn",
    "social_security",
    "phone",
    "address",
    "date_of_birth",
    "credit_card",
    "passport",
];

/// Field classification policy (document form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClassificationPolicy {
    /// Additional case-insensitive substrings identifying sensitive fields.
    ///
    /// Extends [`DEFAULT_SENSITIVE_PATTERNS`] and any parent declarations.
    #[serde(default)]
    pub sensitive_field_patterns: Vec<String>,
}

/// Quality gates a product's transforms must meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QualityGates {
    /// Minimum test coverage, in whole percent (0 disables the gate).
    #[serde(default)]
    pub minimum_test_coverage: u8,

    /// Whether every transform must carry documentation.
    #[serde(default)]
    pub documentation_required: bool,
}

/// Freshness and availability thresholds (document form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SlaThresholds {
    /// Maximum tolerated staleness of product data, in minutes.
    #[serde(default)]
    pub max_freshness_minutes: Option<u32>,

    /// Minimum availability a product must commit to, in whole percent.
    #[serde(default)]
    pub min_availability_percent: Option<u8>,
}

/// A free-form labeled governance rule (EXTEND merge, deduplicated by id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceRule {
    /// Stable identifier for the rule.
    pub id: String,

    /// Optional human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// GovernanceSpec (document form)
// =============================================================================

/// Governance settings as authored in one manifest document.
///
/// Every scalar is optional: an absent field means the tier inherits the
/// value folded so far. The merge strategy per field lives in
/// [`crate::resolve::strategy_for`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GovernanceSpec {
    /// Retention floor in days.
    #[serde(default)]
    pub data_retention_days: Option<u32>,

    /// PII encryption requirement (security-sensitive, strengthen-only).
    #[serde(default)]
    pub pii_encryption: Option<PiiEncryption>,

    /// Audit logging requirement (security-sensitive, strengthen-only).
    #[serde(default)]
    pub audit_logging: Option<AuditLogging>,

    /// Enforcement level (security-sensitive, strengthen-only).
    #[serde(default)]
    pub policy_enforcement_level: Option<EnforcementLevel>,

    /// Schema evolution policy.
    #[serde(default)]
    pub schema_evolution: Option<SchemaEvolutionPolicy>,

    /// SLA thresholds.
    #[serde(default)]
    pub sla: SlaThresholds,

    /// Naming policy.
    #[serde(default)]
    pub naming: Option<NamingPolicy>,

    /// Field classification policy (patterns extend parents').
    #[serde(default)]
    pub classification: ClassificationPolicy,

    /// Quality gates.
    #[serde(default)]
    pub quality: Option<QualityGates>,

    /// Additional governance rules (extend parents', deduplicated by id).
    #[serde(default)]
    pub custom_rules: Vec<GovernanceRule>,
}

// =============================================================================
// EffectiveGovernance (resolved form)
// =============================================================================

/// Defaults applied when no tier in a chain declares a value.
pub mod defaults {
    /// Default retention floor in days.
    pub const DATA_RETENTION_DAYS: u32 = 90;

    /// Default maximum staleness in minutes (one day).
    pub const MAX_FRESHNESS_MINUTES: u32 = 1440;

    /// Default minimum availability in whole percent.
    pub const MIN_AVAILABILITY_PERCENT: u8 = 99;
}

/// Resolved SLA thresholds with defaults applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveSla {
    /// Maximum tolerated staleness of product data, in minutes.
    pub max_freshness_minutes: u32,

    /// Minimum availability a product must commit to, in whole percent.
    pub min_availability_percent: u8,
}

impl Default for EffectiveSla {
    fn default() -> Self {
        Self {
            max_freshness_minutes: defaults::MAX_FRESHNESS_MINUTES,
            min_availability_percent: defaults::MIN_AVAILABILITY_PERCENT,
        }
    }
}

/// Governance settings after folding a full chain: every field concrete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveGovernance {
    /// Retention floor in days.
    pub data_retention_days: u32,

    /// PII encryption requirement.
    pub pii_encryption: PiiEncryption,

    /// Audit logging requirement.
    pub audit_logging: AuditLogging,

    /// Enforcement level.
    pub policy_enforcement_level: EnforcementLevel,

    /// Schema evolution policy.
    pub schema_evolution: SchemaEvolutionPolicy,

    /// SLA thresholds.
    pub sla: EffectiveSla,

    /// Naming policy.
    pub naming: NamingPolicy,

    /// All sensitive-field patterns in effect (defaults plus every tier's
    /// extensions, in fold order, deduplicated).
    pub sensitive_field_patterns: Vec<String>,

    /// Quality gates.
    pub quality: QualityGates,

    /// All custom governance rules in effect.
    pub custom_rules: Vec<GovernanceRule>,
}

impl Default for EffectiveGovernance {
    fn default() -> Self {
        Self {
            data_retention_days: defaults::DATA_RETENTION_DAYS,
            pii_encryption: PiiEncryption::default(),
            audit_logging: AuditLogging::default(),
            policy_enforcement_level: EnforcementLevel::default(),
            schema_evolution: SchemaEvolutionPolicy::default(),
            sla: EffectiveSla::default(),
            naming: NamingPolicy::default(),
            sensitive_field_patterns: DEFAULT_SENSITIVE_PATTERNS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            quality: QualityGates::default(),
            custom_rules: Vec::new(),
        }
    }
}

/// Parent-tier floors captured before the leaf tier folds.
///
/// The governance validator checks leaf declarations against these rather
/// than against the post-fold values, so a leaf cannot satisfy a floor by
/// overriding it away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceFloors {
    /// Minimum retention in days required by the parent tiers.
    pub data_retention_days: u32,

    /// SLA thresholds required by the parent tiers.
    pub sla: EffectiveSla,
}
