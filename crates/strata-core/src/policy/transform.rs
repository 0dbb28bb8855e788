//! Externally supplied transform metadata.
//!
//! The engine never computes coverage, documentation presence, SLAs, or
//! schemas; a build harness supplies one [`TransformRecord`] per transform
//! and enforcement judges the records against the resolved configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The SLA a transform (or its product) declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeclaredSla {
    /// How stale the transform's output may get, in minutes.
    #[serde(default)]
    pub freshness_minutes: Option<u32>,

    /// Committed availability, in whole percent.
    #[serde(default)]
    pub availability_percent: Option<u8>,
}

/// One field of a transform schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// The field's data type, as the producing toolchain names it.
    pub data_type: String,

    /// Whether the field is required (non-nullable) for consumers.
    #[serde(default)]
    pub required: bool,

    /// Classification tag (e.g. `pii`, `confidential`), when assigned.
    #[serde(default)]
    pub classification: Option<String>,

    /// Whether the field is encrypted or masked downstream.
    #[serde(default)]
    pub masked: bool,
}

/// An ordered field map describing a transform's output schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TransformSchema {
    /// Fields by name.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
}

/// Externally supplied metadata for one transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRecord {
    /// The transform's declared name.
    pub name: String,

    /// Measured test coverage in whole percent, when known.
    #[serde(default)]
    pub test_coverage_percent: Option<u8>,

    /// Whether documentation is present for the transform.
    #[serde(default)]
    pub documentation_present: bool,

    /// The SLA the transform declares, if any.
    #[serde(default)]
    pub declared_sla: Option<DeclaredSla>,

    /// The transform's current output schema, when known.
    #[serde(default)]
    pub schema: Option<TransformSchema>,

    /// The previously published schema, for evolution checks.
    #[serde(default)]
    pub previous_schema: Option<TransformSchema>,
}

impl TransformRecord {
    /// Creates a minimal record with just a name; useful in tests and for
    /// naming-only enforcement runs.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            test_coverage_percent: None,
            documentation_present: false,
            declared_sla: None,
            schema: None,
            previous_schema: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_parses_from_json() {
        let json = r#"{
            "name": "bronze_customers",
            "test_coverage_percent": 84,
            "documentation_present": true,
            "declared_sla": {"freshness_minutes": 60, "availability_percent": 99},
            "schema": {
                "fields": {
                    "customer_email": {
                        "data_type": "string",
                        "classification": "pii",
                        "masked": true
                    }
                }
            }
        }"#;
        let record: TransformRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "bronze_customers");
        assert_eq!(record.test_coverage_percent, Some(84));
        let schema = record.schema.unwrap();
        assert!(schema.fields["customer_email"].masked);
    }

    #[test]
    fn minimal_record_defaults() {
        let record = TransformRecord::named("gold_revenue");
        assert!(record.schema.is_none());
        assert!(!record.documentation_present);
    }
}
