//! Schema evolution validator.
//!
//! Diffs each transform's current schema against its previously published
//! schema under the resolved evolution policy:
//!
//! - `strict`: no change of any kind
//! - `additive`: only new optional fields may appear
//! - `any`: unrestricted

use crate::manifest::SchemaEvolutionPolicy;
use crate::resolve::ResolvedManifest;

use super::transform::{TransformRecord, TransformSchema};
use super::violation::{PolicyViolation, Severity, ViolationKind};

/// Checks schema diffs under the resolved evolution policy.
pub(crate) fn check(
    resolved: &ResolvedManifest,
    transforms: &[TransformRecord],
) -> Vec<PolicyViolation> {
    let policy = resolved.governance.schema_evolution;
    if policy == SchemaEvolutionPolicy::Any {
        return Vec::new();
    }

    let mut violations = Vec::new();
    for transform in transforms {
        let (Some(current), Some(previous)) = (&transform.schema, &transform.previous_schema)
        else {
            continue;
        };
        diff_schemas(&transform.name, policy, previous, current, &mut violations);
    }
    violations
}

fn diff_schemas(
    transform: &str,
    policy: SchemaEvolutionPolicy,
    previous: &TransformSchema,
    current: &TransformSchema,
    violations: &mut Vec<PolicyViolation>,
) {
    let expected = match policy {
        SchemaEvolutionPolicy::Strict => "no schema change (policy is strict)",
        SchemaEvolutionPolicy::Additive => "only new optional fields (policy is additive)",
        SchemaEvolutionPolicy::Any => return,
    };
    let mut push = |field: &str, actual: String, hint: &str| {
        violations.push(PolicyViolation::new(
            ViolationKind::SchemaEvolution,
            Severity::Error,
            format!("{transform}.{field}"),
            expected,
            actual,
            hint,
        ));
    };

    for (name, prev_spec) in &previous.fields {
        match current.fields.get(name) {
            None => push(
                name,
                "field removed".to_string(),
                "removing a published field breaks consumers; restore it or publish a new model",
            ),
            Some(spec) if spec.data_type != prev_spec.data_type => push(
                name,
                format!(
                    "type changed from '{}' to '{}'",
                    prev_spec.data_type, spec.data_type
                ),
                "changing a published field's type breaks consumers",
            ),
            Some(spec) if spec.required != prev_spec.required => push(
                name,
                format!(
                    "requiredness changed from {} to {}",
                    prev_spec.required, spec.required
                ),
                "changing a published field's nullability breaks consumers",
            ),
            Some(_) => {},
        }
    }

    for (name, spec) in &current.fields {
        if previous.fields.contains_key(name) {
            continue;
        }
        match policy {
            SchemaEvolutionPolicy::Strict => push(
                name,
                "field added".to_string(),
                "the strict policy freezes the published schema",
            ),
            SchemaEvolutionPolicy::Additive if spec.required => push(
                name,
                "required field added".to_string(),
                "add the field as optional, or backfill and publish a new model",
            ),
            _ => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::policy::test_support::resolved;
    use crate::policy::transform::FieldSpec;

    fn field(data_type: &str, required: bool) -> FieldSpec {
        FieldSpec {
            data_type: data_type.to_string(),
            required,
            classification: None,
            masked: false,
        }
    }

    fn schema(fields: &[(&str, FieldSpec)]) -> TransformSchema {
        TransformSchema {
            fields: fields
                .iter()
                .map(|(name, spec)| (name.to_string(), spec.clone()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn transform(policy_schema: TransformSchema, previous: TransformSchema) -> TransformRecord {
        TransformRecord {
            schema: Some(policy_schema),
            previous_schema: Some(previous),
            ..TransformRecord::named("gold_revenue")
        }
    }

    fn with_policy(policy: SchemaEvolutionPolicy) -> ResolvedManifest {
        let mut resolved = resolved();
        resolved.governance.schema_evolution = policy;
        resolved
    }

    #[test]
    fn additive_allows_new_optional_field() {
        let previous = schema(&[("id", field("string", true))]);
        let current = schema(&[("id", field("string", true)), ("note", field("string", false))]);
        let resolved = with_policy(SchemaEvolutionPolicy::Additive);
        assert!(check(&resolved, &[transform(current, previous)]).is_empty());
    }

    #[test]
    fn additive_rejects_new_required_field() {
        let previous = schema(&[("id", field("string", true))]);
        let current = schema(&[("id", field("string", true)), ("tier", field("string", true))]);
        let resolved = with_policy(SchemaEvolutionPolicy::Additive);
        let violations = check(&resolved, &[transform(current, previous)]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].subject, "gold_revenue.tier");
    }

    #[test]
    fn additive_rejects_removed_field() {
        let previous = schema(&[("id", field("string", true)), ("note", field("string", false))]);
        let current = schema(&[("id", field("string", true))]);
        let resolved = with_policy(SchemaEvolutionPolicy::Additive);
        let violations = check(&resolved, &[transform(current, previous)]);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].actual.contains("removed"));
    }

    #[test]
    fn additive_rejects_type_change() {
        let previous = schema(&[("amount", field("integer", true))]);
        let current = schema(&[("amount", field("decimal", true))]);
        let resolved = with_policy(SchemaEvolutionPolicy::Additive);
        let violations = check(&resolved, &[transform(current, previous)]);
        assert!(violations[0].actual.contains("integer"));
        assert!(violations[0].actual.contains("decimal"));
    }

    #[test]
    fn strict_rejects_even_optional_addition() {
        let previous = schema(&[("id", field("string", true))]);
        let current = schema(&[("id", field("string", true)), ("note", field("string", false))]);
        let resolved = with_policy(SchemaEvolutionPolicy::Strict);
        assert_eq!(check(&resolved, &[transform(current, previous)]).len(), 1);
    }

    #[test]
    fn strict_accepts_identical_schema() {
        let previous = schema(&[("id", field("string", true))]);
        let resolved = with_policy(SchemaEvolutionPolicy::Strict);
        assert!(check(&resolved, &[transform(previous.clone(), previous)]).is_empty());
    }

    #[test]
    fn any_policy_skips_all_checks() {
        let previous = schema(&[("id", field("string", true))]);
        let current = schema(&[("renamed", field("integer", true))]);
        let resolved = with_policy(SchemaEvolutionPolicy::Any);
        assert!(check(&resolved, &[transform(current, previous)]).is_empty());
    }

    #[test]
    fn first_publication_has_nothing_to_diff() {
        let current = schema(&[("id", field("string", true))]);
        let record = TransformRecord {
            schema: Some(current),
            previous_schema: None,
            ..TransformRecord::named("gold_revenue")
        };
        let resolved = with_policy(SchemaEvolutionPolicy::Strict);
        assert!(check(&resolved, &[record]).is_empty());
    }
}
