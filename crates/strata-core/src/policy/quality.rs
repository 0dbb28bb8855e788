//! Quality gate validator: test coverage and documentation.

use crate::resolve::ResolvedManifest;

use super::transform::TransformRecord;
use super::violation::{PolicyViolation, Severity, ViolationKind};

/// Checks coverage and documentation gates per transform.
pub(crate) fn check(
    resolved: &ResolvedManifest,
    transforms: &[TransformRecord],
) -> Vec<PolicyViolation> {
    let gates = resolved.governance.quality;
    let mut violations = Vec::new();

    for transform in transforms {
        if gates.minimum_test_coverage > 0 {
            match transform.test_coverage_percent {
                Some(actual) if actual < gates.minimum_test_coverage => {
                    violations.push(PolicyViolation::new(
                        ViolationKind::Quality,
                        Severity::Error,
                        transform.name.clone(),
                        format!("test coverage >= {}%", gates.minimum_test_coverage),
                        format!("{actual}%"),
                        "add tests until the transform meets the coverage gate",
                    ));
                },
                None => {
                    violations.push(PolicyViolation::new(
                        ViolationKind::Quality,
                        Severity::Warning,
                        transform.name.clone(),
                        format!("test coverage >= {}%", gates.minimum_test_coverage),
                        "no coverage data supplied".to_string(),
                        "wire the coverage report into the compilation inputs",
                    ));
                },
                Some(_) => {},
            }
        }

        if gates.documentation_required && !transform.documentation_present {
            violations.push(PolicyViolation::new(
                ViolationKind::Quality,
                Severity::Error,
                transform.name.clone(),
                "documentation present",
                "no documentation".to_string(),
                "add a description for the transform",
            ));
        }
    }
    violations
}
