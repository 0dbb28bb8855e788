//! The policy enforcer: composes the independent validators.

use tracing::{debug, info};

use crate::manifest::EnforcementLevel;
use crate::resolve::ResolvedManifest;

use super::transform::TransformRecord;
use super::violation::{PolicyViolation, Severity, ViolationKind};
use super::{approval, classification, evolution, naming, quality, sla};

/// Maximum number of transform records accepted per enforcement run.
pub const MAX_TRANSFORM_RECORDS: usize = 4096;

/// Runs every policy validator over a resolved manifest.
///
/// Stateless; all validators are pure, so enforcement is deterministic and
/// side-effect free apart from logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEnforcer;

impl PolicyEnforcer {
    /// Runs all validators and returns every violation found.
    ///
    /// The enforcement level never filters the returned list — a single run
    /// reports everything it finds. It only decides how the result is
    /// logged here and whether the pipeline treats error-severity
    /// violations as fatal (see [`PolicyEnforcer::blocks`]).
    #[must_use]
    pub fn enforce(
        resolved: &ResolvedManifest,
        transforms: &[TransformRecord],
        level: EnforcementLevel,
    ) -> Vec<PolicyViolation> {
        if transforms.len() > MAX_TRANSFORM_RECORDS {
            return vec![PolicyViolation::new(
                ViolationKind::Governance,
                Severity::Error,
                "transforms",
                format!("at most {MAX_TRANSFORM_RECORDS} transform records"),
                format!("{} records", transforms.len()),
                "split the product into smaller compilation units",
            )];
        }

        let mut violations = Vec::new();
        violations.extend(naming::check(resolved, transforms));
        violations.extend(classification::check(resolved, transforms));
        violations.extend(quality::check(resolved, transforms));
        violations.extend(sla::check(resolved, transforms));
        violations.extend(evolution::check(resolved, transforms));
        violations.extend(approval::check(resolved));

        let errors = violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
            .count();
        match level {
            EnforcementLevel::Off => debug!(
                product = %resolved.metadata.name,
                total = violations.len(),
                errors,
                "policy violations computed for logging only (enforcement off)"
            ),
            _ => info!(
                product = %resolved.metadata.name,
                total = violations.len(),
                errors,
                level = %level,
                "policy enforcement complete"
            ),
        }
        violations
    }

    /// Returns true when the given level treats the violation set as fatal.
    #[must_use]
    pub fn blocks(level: EnforcementLevel, violations: &[PolicyViolation]) -> bool {
        level.blocks_on_error() && violations.iter().any(|v| v.severity == Severity::Error)
    }
}
