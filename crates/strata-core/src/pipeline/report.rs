//! The diagnostics report emitted by every compilation run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artifacts::CompiledArtifacts;
use crate::manifest::EnforcementLevel;
use crate::policy::{PolicyViolation, Severity};

// =============================================================================
// PipelineStage
// =============================================================================

/// The stages of a compilation run, in the only order they may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PipelineStage {
    /// The raw document parsed.
    Loaded,

    /// The document passed schema validation.
    SchemaValid,

    /// The manifest chain resolved into an effective configuration.
    Resolved,

    /// Policy enforcement ran to completion.
    PolicyChecked,

    /// The compiled artifacts boundary object was emitted.
    ArtifactsEmitted,

    /// The run halted on a fatal diagnostic. Reachable from any stage.
    Failed,
}

impl PipelineStage {
    /// Returns the wire name for this stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::SchemaValid => "schema_valid",
            Self::Resolved => "resolved",
            Self::PolicyChecked => "policy_checked",
            Self::ArtifactsEmitted => "artifacts_emitted",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Failure diagnostics
// =============================================================================

/// The error family that halted a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum FailureKind {
    /// The document was malformed or schema-invalid.
    Schema,

    /// The chain failed to resolve (cycle, missing parent, incompatible
    /// version, immutability violation).
    Resolution,

    /// Strict enforcement found error-severity policy violations.
    Policy,

    /// The requested namespace is invalid or owned by another repository.
    Namespace,
}

impl FailureKind {
    /// Returns the wire name for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Resolution => "resolution",
            Self::Policy => "policy",
            Self::Namespace => "namespace",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The fatal diagnostic that moved a run to [`PipelineStage::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDiagnostic {
    /// The error family.
    pub kind: FailureKind,

    /// The stage that was being attempted when the run halted.
    pub stage: PipelineStage,

    /// Rendered error message, actionable without engine internals.
    pub message: String,
}

impl std::fmt::Display for FailureDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}@{}] {}", self.kind, self.stage, self.message)
    }
}

// =============================================================================
// ViolationSummary
// =============================================================================

/// Per-kind violation counts, for CI gates that act on totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ViolationSummary {
    /// Total violations found.
    pub total: usize,

    /// Error-severity violations.
    pub errors: usize,

    /// Warning-severity violations.
    pub warnings: usize,

    /// Counts keyed by violation kind wire name.
    pub by_kind: BTreeMap<String, usize>,
}

impl ViolationSummary {
    /// Tallies a violation list.
    #[must_use]
    pub fn tally(violations: &[PolicyViolation]) -> Self {
        let mut summary = Self {
            total: violations.len(),
            ..Self::default()
        };
        for violation in violations {
            match violation.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
            }
            *summary
                .by_kind
                .entry(violation.kind.as_str().to_string())
                .or_insert(0) += 1;
        }
        summary
    }
}

// =============================================================================
// CompilationReport
// =============================================================================

/// Everything one compilation run produced: terminal state, every policy
/// violation found, the fatal diagnostic if any, and the artifacts on
/// success.
///
/// Consumable by a CLI or CI gate through [`CompilationReport::exit_code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationReport {
    /// Unique id of this run.
    pub run_id: Uuid,

    /// The product name, once the document loaded far enough to know it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run reached its terminal stage.
    pub finished_at: DateTime<Utc>,

    /// The stage the run ended in.
    pub terminal_stage: PipelineStage,

    /// The resolved enforcement level, once resolution succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement_level: Option<EnforcementLevel>,

    /// Every policy violation found, fatal or not.
    pub violations: Vec<PolicyViolation>,

    /// Per-kind counts over `violations`.
    pub summary: ViolationSummary,

    /// The fatal diagnostic, when the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDiagnostic>,

    /// The boundary object, when the run succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<CompiledArtifacts>,
}

impl CompilationReport {
    /// Returns true when the run emitted artifacts.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.terminal_stage == PipelineStage::ArtifactsEmitted
    }

    /// Maps the run outcome to a process exit code.
    ///
    /// Zero violations or warn-level-only outcomes are success; any fatal
    /// stage is non-zero.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.succeeded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ViolationKind;

    fn violation(kind: ViolationKind, severity: Severity) -> PolicyViolation {
        PolicyViolation::new(kind, severity, "subject", "expected", "actual", "hint")
    }

    #[test]
    fn summary_tallies_by_severity_and_kind() {
        let violations = vec![
            violation(ViolationKind::Naming, Severity::Error),
            violation(ViolationKind::Naming, Severity::Error),
            violation(ViolationKind::Quality, Severity::Warning),
        ];
        let summary = ViolationSummary::tally(&violations);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.by_kind["naming"], 2);
        assert_eq!(summary.by_kind["quality"], 1);
    }

    #[test]
    fn exit_code_tracks_terminal_stage() {
        let mut report = CompilationReport {
            run_id: Uuid::nil(),
            product: Some("orders".to_string()),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            terminal_stage: PipelineStage::ArtifactsEmitted,
            enforcement_level: None,
            violations: Vec::new(),
            summary: ViolationSummary::default(),
            failure: None,
            artifacts: None,
        };
        assert!(report.succeeded());
        assert_eq!(report.exit_code(), 0);

        report.terminal_stage = PipelineStage::Failed;
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn stage_wire_names() {
        assert_eq!(PipelineStage::SchemaValid.as_str(), "schema_valid");
        assert_eq!(
            serde_json::to_string(&PipelineStage::ArtifactsEmitted).unwrap(),
            "\"artifacts_emitted\""
        );
        assert_eq!(FailureKind::Namespace.as_str(), "namespace");
    }
}
