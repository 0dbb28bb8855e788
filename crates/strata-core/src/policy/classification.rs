//! Field classification validator.
//!
//! Fields whose names match a resolved sensitive pattern must carry a
//! classification tag; when the resolved configuration requires PII
//! encryption, they must additionally be encrypted or masked downstream.

use crate::manifest::PiiEncryption;
use crate::resolve::ResolvedManifest;

use super::transform::TransformRecord;
use super::violation::{PolicyViolation, Severity, ViolationKind};

/// Checks sensitive fields for classification tags and masking.
pub(crate) fn check(
    resolved: &ResolvedManifest,
    transforms: &[TransformRecord],
) -> Vec<PolicyViolation> {
    let patterns: Vec<String> = resolved
        .governance
        .sensitive_field_patterns
        .iter()
        .map(|p| p.to_lowercase())
        .collect();
    let encryption_required = resolved.governance.pii_encryption == PiiEncryption::Required;

    let mut violations = Vec::new();
    for transform in transforms {
        let Some(schema) = &transform.schema else {
            continue;
        };
        for (field_name, spec) in &schema.fields {
            let lowered = field_name.to_lowercase();
            let Some(pattern) = patterns.iter().find(|p| lowered.contains(p.as_str())) else {
                continue;
            };
            let subject = format!("{}.{}", transform.name, field_name);

            if spec.classification.is_none() {
                violations.push(PolicyViolation::new(
                    ViolationKind::Classification,
                    Severity::Error,
                    subject.clone(),
                    format!("a classification tag (field matches sensitive pattern '{pattern}')"),
                    "no classification tag".to_string(),
                    "tag the field (e.g. classification: pii) or rename it",
                ));
            }
            if encryption_required && !spec.masked {
                violations.push(PolicyViolation::new(
                    ViolationKind::Classification,
                    Severity::Error,
                    subject,
                    "encryption or masking downstream (pii_encryption is required)",
                    "field is not masked".to_string(),
                    "mask or encrypt the field in the publishing transform",
                ));
            }
        }
    }
    violations
}
