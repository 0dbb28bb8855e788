//! Governance floor validator: retention and SLA.
//!
//! Floors come from the parent fold (enterprise ⊕ domain), captured before
//! the leaf tier folded, so a leaf cannot satisfy a floor by overriding it
//! away.

use crate::resolve::ResolvedManifest;

use super::transform::TransformRecord;
use super::violation::{PolicyViolation, Severity, ViolationKind};

/// Checks the resolved retention against the floor and each declared SLA
/// against the resolved minimums.
pub(crate) fn check(
    resolved: &ResolvedManifest,
    transforms: &[TransformRecord],
) -> Vec<PolicyViolation> {
    let mut violations = Vec::new();
    let floors = &resolved.floors;

    if resolved.governance.data_retention_days < floors.data_retention_days {
        violations.push(PolicyViolation::new(
            ViolationKind::Governance,
            Severity::Error,
            "governance.data_retention_days",
            format!("at least {} days (resolved floor)", floors.data_retention_days),
            format!("{} days", resolved.governance.data_retention_days),
            "raise the product's retention to meet the domain floor",
        ));
    }

    for transform in transforms {
        let Some(sla) = &transform.declared_sla else {
            continue;
        };
        if let Some(freshness) = sla.freshness_minutes {
            if freshness > floors.sla.max_freshness_minutes {
                violations.push(PolicyViolation::new(
                    ViolationKind::Governance,
                    Severity::Error,
                    transform.name.clone(),
                    format!(
                        "freshness within {} minutes",
                        floors.sla.max_freshness_minutes
                    ),
                    format!("{freshness} minutes"),
                    "tighten the transform's freshness SLA or renegotiate the domain floor",
                ));
            }
        }
        if let Some(availability) = sla.availability_percent {
            if availability < floors.sla.min_availability_percent {
                violations.push(PolicyViolation::new(
                    ViolationKind::Governance,
                    Severity::Error,
                    transform.name.clone(),
                    format!(
                        "availability >= {}%",
                        floors.sla.min_availability_percent
                    ),
                    format!("{availability}%"),
                    "raise the transform's availability commitment",
                ));
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::test_support::resolved;
    use crate::policy::transform::DeclaredSla;

    #[test]
    fn retention_below_floor_is_violation() {
        let mut resolved = resolved();
        resolved.floors.data_retention_days = 365;
        resolved.governance.data_retention_days = 30;
        let violations = check(&resolved, &[]);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].expected.contains("365"));
        assert!(violations[0].actual.contains("30"));
    }

    #[test]
    fn retention_at_floor_passes() {
        let mut resolved = resolved();
        resolved.floors.data_retention_days = 365;
        resolved.governance.data_retention_days = 365;
        assert!(check(&resolved, &[]).is_empty());
    }

    #[test]
    fn stale_freshness_sla_is_violation() {
        let mut resolved = resolved();
        resolved.floors.sla.max_freshness_minutes = 60;
        let transform = TransformRecord {
            declared_sla: Some(DeclaredSla {
                freshness_minutes: Some(240),
                availability_percent: None,
            }),
            ..TransformRecord::named("gold_revenue")
        };
        let violations = check(&resolved, &[transform]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::Governance);
    }

    #[test]
    fn low_availability_sla_is_violation() {
        let mut resolved = resolved();
        resolved.floors.sla.min_availability_percent = 99;
        let transform = TransformRecord {
            declared_sla: Some(DeclaredSla {
                freshness_minutes: None,
                availability_percent: Some(95),
            }),
            ..TransformRecord::named("gold_revenue")
        };
        assert_eq!(check(&resolved, &[transform]).len(), 1);
    }

    #[test]
    fn meeting_both_minimums_passes() {
        let mut resolved = resolved();
        resolved.floors.sla.max_freshness_minutes = 60;
        resolved.floors.sla.min_availability_percent = 99;
        let transform = TransformRecord {
            declared_sla: Some(DeclaredSla {
                freshness_minutes: Some(30),
                availability_percent: Some(100),
            }),
            ..TransformRecord::named("gold_revenue")
        };
        assert!(check(&resolved, &[transform]).is_empty());
    }

    #[test]
    fn undeclared_sla_is_not_judged() {
        let mut resolved = resolved();
        resolved.floors.sla.max_freshness_minutes = 1;
        assert!(check(&resolved, &[TransformRecord::named("gold_revenue")]).is_empty());
    }
}
