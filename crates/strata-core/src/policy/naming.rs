//! Naming policy validator.

use regex::Regex;

use crate::manifest::NamingPolicy;
use crate::resolve::ResolvedManifest;

use super::transform::TransformRecord;
use super::violation::{PolicyViolation, Severity, ViolationKind};

/// The built-in medallion layer prefixes.
pub(crate) const MEDALLION_PREFIXES: &[&str] = &["bronze_", "silver_", "gold_"];

/// Common staging prefixes stripped when suggesting medallion renames.
const STAGE_PREFIXES: &[&str] = &["stg_", "staging_", "int_", "raw_", "tmp_", "temp_"];

/// Checks every transform name against the resolved naming policy.
pub(crate) fn check(
    resolved: &ResolvedManifest,
    transforms: &[TransformRecord],
) -> Vec<PolicyViolation> {
    match &resolved.governance.naming {
        NamingPolicy::Disabled => Vec::new(),
        NamingPolicy::Medallion => transforms
            .iter()
            .filter(|t| !has_medallion_prefix(&t.name))
            .map(|t| {
                let suggestions = medallion_suggestions(&t.name);
                PolicyViolation::new(
                    ViolationKind::Naming,
                    Severity::Error,
                    t.name.clone(),
                    "a medallion-prefixed name (bronze_|silver_|gold_)",
                    t.name.clone(),
                    format!("rename to one of: {}", suggestions.join(", ")),
                )
            })
            .collect(),
        NamingPolicy::Pattern { pattern } => check_pattern(pattern, transforms),
    }
}

fn check_pattern(pattern: &str, transforms: &[TransformRecord]) -> Vec<PolicyViolation> {
    // Full-match semantics: a policy pattern describes the whole name.
    let anchored = format!("^(?:{pattern})$");
    let regex = match Regex::new(&anchored) {
        Ok(regex) => regex,
        Err(error) => {
            return vec![PolicyViolation::new(
                ViolationKind::Naming,
                Severity::Error,
                "governance.naming.pattern",
                "a valid regular expression",
                pattern.to_string(),
                format!("fix the naming pattern: {error}"),
            )];
        },
    };
    transforms
        .iter()
        .filter(|t| !regex.is_match(&t.name))
        .map(|t| {
            PolicyViolation::new(
                ViolationKind::Naming,
                Severity::Error,
                t.name.clone(),
                format!("a name matching '{pattern}'"),
                t.name.clone(),
                "rename the transform to match the naming pattern",
            )
        })
        .collect()
}

fn has_medallion_prefix(name: &str) -> bool {
    MEDALLION_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Suggests medallion-layer renames, stripping a recognized staging prefix
/// first so `stg_customers` suggests `bronze_customers` rather than
/// `bronze_stg_customers`.
fn medallion_suggestions(name: &str) -> Vec<String> {
    let base = STAGE_PREFIXES
        .iter()
        .find_map(|p| name.strip_prefix(p))
        .unwrap_or(name);
    MEDALLION_PREFIXES
        .iter()
        .map(|p| format!("{p}{base}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::test_support::resolved_with_naming;

    #[test]
    fn medallion_names_pass() {
        let resolved = resolved_with_naming(NamingPolicy::Medallion);
        let transforms = vec![
            TransformRecord::named("bronze_customers"),
            TransformRecord::named("silver_orders"),
            TransformRecord::named("gold_revenue"),
        ];
        assert!(check(&resolved, &transforms).is_empty());
    }

    #[test]
    fn stage_prefixed_name_gets_rename_suggestions() {
        let resolved = resolved_with_naming(NamingPolicy::Medallion);
        let violations = check(&resolved, &[TransformRecord::named("stg_customers")]);
        assert_eq!(violations.len(), 1);
        let hint = &violations[0].hint;
        assert!(hint.contains("bronze_customers"));
        assert!(hint.contains("silver_customers"));
        assert!(hint.contains("gold_customers"));
    }

    #[test]
    fn unprefixed_name_suggests_plain_medallion_variants() {
        let resolved = resolved_with_naming(NamingPolicy::Medallion);
        let violations = check(&resolved, &[TransformRecord::named("customers")]);
        assert!(violations[0].hint.contains("bronze_customers"));
    }

    #[test]
    fn custom_pattern_is_full_match() {
        let resolved = resolved_with_naming(NamingPolicy::Pattern {
            pattern: "dm_[a-z]+".to_string(),
        });
        let transforms = vec![
            TransformRecord::named("dm_orders"),
            TransformRecord::named("dm_orders_v2"),
        ];
        let violations = check(&resolved, &transforms);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].subject, "dm_orders_v2");
    }

    #[test]
    fn invalid_pattern_reports_once_against_the_policy() {
        let resolved = resolved_with_naming(NamingPolicy::Pattern {
            pattern: "(".to_string(),
        });
        let violations = check(&resolved, &[TransformRecord::named("anything")]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].subject, "governance.naming.pattern");
    }

    #[test]
    fn disabled_policy_checks_nothing() {
        let resolved = resolved_with_naming(NamingPolicy::Disabled);
        assert!(check(&resolved, &[TransformRecord::named("anything")]).is_empty());
    }
}
