//! The policy violation record.

use serde::{Deserialize, Serialize};

// =============================================================================
// Severity
// =============================================================================

/// How serious a violation is.
///
/// # Ordering
///
/// `Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Severity {
    /// Advisory; never blocks compilation.
    Warning,

    /// Blocks compilation under strict enforcement.
    Error,
}

impl Severity {
    /// Returns the numeric rank of this severity.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Warning => 0,
            Self::Error => 1,
        }
    }

    /// Returns the wire name for this severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

// =============================================================================
// ViolationKind
// =============================================================================

/// The policy family a violation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ViolationKind {
    /// Transform naming policy.
    Naming,

    /// Sensitive-field classification and masking.
    Classification,

    /// Test coverage and documentation gates.
    Quality,

    /// Retention and SLA floors.
    Governance,

    /// Plugin declared or selected outside the approved whitelist.
    PluginApproval,

    /// Product not approved by its domain.
    ProductApproval,

    /// A security-sensitive field was weakened (reported alongside the
    /// fatal resolution error for visibility in the diagnostics report).
    SecurityWeakening,

    /// Schema change outside the resolved evolution policy.
    SchemaEvolution,
}

impl ViolationKind {
    /// Returns the wire name for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Naming => "naming",
            Self::Classification => "classification",
            Self::Quality => "quality",
            Self::Governance => "governance",
            Self::PluginApproval => "plugin-approval",
            Self::ProductApproval => "product-approval",
            Self::SecurityWeakening => "security-weakening",
            Self::SchemaEvolution => "schema-evolution",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// PolicyViolation
// =============================================================================

/// One policy violation found during enforcement. Immutable once created.
///
/// Carries enough structured context (subject, expected, actual, hint) to
/// be actionable without reference to engine internals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    /// The policy family.
    pub kind: ViolationKind,

    /// Whether the violation blocks under strict enforcement.
    pub severity: Severity,

    /// The field, transform, or model the violation is about.
    pub subject: String,

    /// What the resolved policy requires.
    pub expected: String,

    /// What was actually declared or observed.
    pub actual: String,

    /// How to resolve the violation.
    pub hint: String,
}

impl PolicyViolation {
    /// Creates a violation record.
    pub fn new(
        kind: ViolationKind,
        severity: Severity,
        subject: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            subject: subject.into(),
            expected: expected.into(),
            actual: actual.into(),
            hint: hint.into(),
        }
    }
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {}: expected {}, got {} ({})",
            self.kind, self.severity, self.subject, self.expected, self.actual, self.hint
        )
    }
}
