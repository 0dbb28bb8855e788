//! Manifest loading: raw parse plus schema validation.
//!
//! Loading is split into two stages so the compilation pipeline can report
//! them separately:
//!
//! 1. [`ManifestLoader::read`] parses raw bytes into a [`RawManifest`]
//!    (YAML; the JSON document encoding parses through the same path).
//! 2. [`RawManifest::validate`] checks required fields, the API version
//!    window, enum values, and structural invariants, then produces the
//!    typed [`Manifest`].
//!
//! The loader is pure: no I/O, no knowledge of parent documents. Unknown
//! `scope` values are tolerated and treated as two-tier documents, so a
//! well-formed document authored against a newer minor dialect still loads.

use serde_yaml::Value;
use thiserror::Error;

use super::schema::{
    Manifest, TierScope, MAX_CUSTOM_RULES, MAX_NAME_LENGTH, MAX_PLUGINS_PER_CATEGORY,
    MAX_SENSITIVE_PATTERNS,
};
use super::version::{ApiVersion, ApiVersionError};

/// Maximum accepted manifest document size in bytes.
pub const MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

// =============================================================================
// SchemaError
// =============================================================================

/// Errors from parsing or validating a manifest document.
///
/// Always fatal: a document that fails schema validation never enters
/// resolution. Each variant carries the offending field path and the
/// expected versus actual shape, so the error is actionable without
/// reference to engine internals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// The document is not parseable at all.
    #[error("manifest document is not valid YAML/JSON: {message}")]
    Malformed {
        /// Parser diagnostic.
        message: String,
    },

    /// The document exceeds the accepted size.
    #[error("manifest document too large: {size} bytes exceeds maximum of {max} bytes")]
    DocumentTooLarge {
        /// Actual size in bytes.
        size: usize,
        /// Maximum accepted size.
        max: usize,
    },

    /// A required field is absent.
    #[error("required field '{field}' is missing")]
    MissingField {
        /// Path of the missing field.
        field: String,
    },

    /// A field holds a value outside its declared shape.
    #[error("field '{field}' is invalid: expected {expected}, got '{actual}'")]
    InvalidValue {
        /// Path of the offending field.
        field: String,
        /// The expected shape or value set.
        expected: String,
        /// The actual value, rendered for diagnostics.
        actual: String,
    },

    /// A bounded collection exceeds its limit.
    #[error("field '{field}' exceeds limits: {reason}")]
    LimitExceeded {
        /// Path of the offending field.
        field: String,
        /// Which limit was exceeded.
        reason: String,
    },

    /// The declared `api_version` is outside the supported window.
    #[error("unsupported api version '{actual}': {reason}")]
    UnsupportedApiVersion {
        /// The declared version string.
        actual: String,
        /// Why it is unsupported.
        reason: String,
    },
}

// =============================================================================
// ManifestLoader / RawManifest
// =============================================================================

/// Parses and validates manifest documents.
///
/// Stateless; both stages are associated functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestLoader;

impl ManifestLoader {
    /// Parses raw bytes into an unvalidated document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DocumentTooLarge`] or [`SchemaError::Malformed`].
    pub fn read(bytes: &[u8]) -> Result<RawManifest, SchemaError> {
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(SchemaError::DocumentTooLarge {
                size: bytes.len(),
                max: MAX_DOCUMENT_BYTES,
            });
        }
        let value: Value = serde_yaml::from_slice(bytes).map_err(|e| SchemaError::Malformed {
            message: e.to_string(),
        })?;
        Ok(RawManifest { value })
    }

    /// Parses and validates in one step.
    ///
    /// # Errors
    ///
    /// Returns any [`SchemaError`] from either stage.
    pub fn load(bytes: &[u8]) -> Result<Manifest, SchemaError> {
        Self::read(bytes)?.validate()
    }
}

/// A parsed-but-unvalidated manifest document.
#[derive(Debug, Clone)]
pub struct RawManifest {
    value: Value,
}

impl RawManifest {
    /// Validates the document and produces the typed [`Manifest`].
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] carrying the offending field path.
    pub fn validate(mut self) -> Result<Manifest, SchemaError> {
        let map = self
            .value
            .as_mapping_mut()
            .ok_or_else(|| SchemaError::InvalidValue {
                field: "<document>".to_string(),
                expected: "a mapping".to_string(),
                actual: "a non-mapping value".to_string(),
            })?;

        // api_version: mandatory, within the supported window.
        let api_version = require_string(map, "api_version")?;
        ApiVersion::parse_supported(&api_version).map_err(|e| match e {
            ApiVersionError::Malformed { value } => SchemaError::InvalidValue {
                field: "api_version".to_string(),
                expected: "'<group>/v<major>'".to_string(),
                actual: value,
            },
            other => SchemaError::UnsupportedApiVersion {
                actual: api_version.clone(),
                reason: other.to_string(),
            },
        })?;

        // metadata: mandatory name/version/owner.
        {
            let metadata = map
                .get(Value::from("metadata"))
                .ok_or_else(|| SchemaError::MissingField {
                    field: "metadata".to_string(),
                })?
                .as_mapping()
                .ok_or_else(|| SchemaError::InvalidValue {
                    field: "metadata".to_string(),
                    expected: "a mapping".to_string(),
                    actual: "a non-mapping value".to_string(),
                })?;
            for key in ["name", "version", "owner"] {
                let field = format!("metadata.{key}");
                let value = require_string_at(metadata, key, &field)?;
                if value.is_empty() {
                    return Err(SchemaError::InvalidValue {
                        field,
                        expected: "a non-empty string".to_string(),
                        actual: String::new(),
                    });
                }
                if value.len() > MAX_NAME_LENGTH {
                    return Err(SchemaError::LimitExceeded {
                        field,
                        reason: format!(
                            "length {} exceeds maximum {MAX_NAME_LENGTH}",
                            value.len()
                        ),
                    });
                }
            }
            let version = require_string_at(metadata, "version", "metadata.version")?;
            validate_semver(&version)?;
        }

        // scope: known values pass through; unknown strings mean the document
        // was authored against a newer dialect and resolve as two-tier.
        let scope = match map.get(Value::from("scope")) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => {
                let parsed = TierScope::parse(s);
                if parsed.is_none() {
                    map.remove(Value::from("scope"));
                }
                parsed
            },
            Some(other) => {
                return Err(SchemaError::InvalidValue {
                    field: "scope".to_string(),
                    expected: "'enterprise' or 'domain'".to_string(),
                    actual: render(other),
                });
            },
        };

        // Governance enum fields get explicit pre-checks so diagnostics carry
        // a precise field path instead of a serde parse trace.
        if let Some(governance) = map.get(Value::from("governance")) {
            let governance = governance
                .as_mapping()
                .ok_or_else(|| SchemaError::InvalidValue {
                    field: "governance".to_string(),
                    expected: "a mapping".to_string(),
                    actual: "a non-mapping value".to_string(),
                })?;
            check_enum_field(
                governance,
                "governance.pii_encryption",
                "pii_encryption",
                &["optional", "required"],
            )?;
            check_enum_field(
                governance,
                "governance.audit_logging",
                "audit_logging",
                &["disabled", "enabled"],
            )?;
            check_enum_field(
                governance,
                "governance.policy_enforcement_level",
                "policy_enforcement_level",
                &["off", "warn", "strict"],
            )?;
            check_enum_field(
                governance,
                "governance.schema_evolution",
                "schema_evolution",
                &["strict", "additive", "any"],
            )?;
            match governance.get(Value::from("naming")) {
                None | Some(Value::Null) => {},
                Some(naming) => {
                    let naming = naming
                        .as_mapping()
                        .ok_or_else(|| SchemaError::InvalidValue {
                            field: "governance.naming".to_string(),
                            expected: "a mapping with a 'mode' key".to_string(),
                            actual: "a non-mapping value".to_string(),
                        })?;
                    check_enum_field(
                        naming,
                        "governance.naming.mode",
                        "mode",
                        &["medallion", "pattern", "disabled"],
                    )?;
                },
            }
        }

        // Typed construction; anything the pre-checks did not cover surfaces
        // here with the serde diagnostic.
        let manifest: Manifest =
            serde_yaml::from_value(self.value).map_err(|e| SchemaError::Malformed {
                message: e.to_string(),
            })?;

        // Structural invariants per tier.
        match scope {
            Some(TierScope::Enterprise) => {
                if let Some(parent) = &manifest.parent_manifest {
                    return Err(SchemaError::InvalidValue {
                        field: "parent_manifest".to_string(),
                        expected: "absent for enterprise scope".to_string(),
                        actual: parent.clone(),
                    });
                }
            },
            Some(TierScope::Domain) => {
                if manifest.parent_manifest.is_none() {
                    return Err(SchemaError::MissingField {
                        field: "parent_manifest".to_string(),
                    });
                }
            },
            None => {},
        }

        // Bounded collections.
        for (category, plugins) in &manifest.approved_plugins {
            if plugins.len() > MAX_PLUGINS_PER_CATEGORY {
                return Err(SchemaError::LimitExceeded {
                    field: format!("approved_plugins.{category}"),
                    reason: format!(
                        "{} plugins exceeds maximum {MAX_PLUGINS_PER_CATEGORY}",
                        plugins.len()
                    ),
                });
            }
        }
        let patterns = &manifest.governance.classification.sensitive_field_patterns;
        if patterns.len() > MAX_SENSITIVE_PATTERNS {
            return Err(SchemaError::LimitExceeded {
                field: "governance.classification.sensitive_field_patterns".to_string(),
                reason: format!(
                    "{} patterns exceeds maximum {MAX_SENSITIVE_PATTERNS}",
                    patterns.len()
                ),
            });
        }
        if manifest.governance.custom_rules.len() > MAX_CUSTOM_RULES {
            return Err(SchemaError::LimitExceeded {
                field: "governance.custom_rules".to_string(),
                reason: format!(
                    "{} rules exceeds maximum {MAX_CUSTOM_RULES}",
                    manifest.governance.custom_rules.len()
                ),
            });
        }
        if let Some(namespace) = &manifest.namespace {
            if namespace.len() > MAX_NAME_LENGTH {
                return Err(SchemaError::LimitExceeded {
                    field: "namespace".to_string(),
                    reason: format!(
                        "length {} exceeds maximum {MAX_NAME_LENGTH}",
                        namespace.len()
                    ),
                });
            }
        }

        Ok(manifest)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn require_string(
    map: &serde_yaml::Mapping,
    field: &str,
) -> Result<String, SchemaError> {
    require_string_at(map, field, field)
}

fn require_string_at(
    map: &serde_yaml::Mapping,
    key: &str,
    field: &str,
) -> Result<String, SchemaError> {
    match map.get(Value::from(key)) {
        None | Some(Value::Null) => Err(SchemaError::MissingField {
            field: field.to_string(),
        }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(SchemaError::InvalidValue {
            field: field.to_string(),
            expected: "a string".to_string(),
            actual: render(other),
        }),
    }
}

fn check_enum_field(
    map: &serde_yaml::Mapping,
    field: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), SchemaError> {
    match map.get(Value::from(key)) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(s)) if allowed.contains(&s.as_str()) => Ok(()),
        Some(other) => Err(SchemaError::InvalidValue {
            field: field.to_string(),
            expected: format!("one of {allowed:?}"),
            actual: render(other),
        }),
    }
}

fn validate_semver(version: &str) -> Result<(), SchemaError> {
    let parts: Vec<&str> = version.split('.').collect();
    let ok = parts.len() == 3 && parts.iter().all(|p| p.parse::<u64>().is_ok());
    if ok {
        Ok(())
    } else {
        Err(SchemaError::InvalidValue {
            field: "metadata.version".to_string(),
            expected: "a semantic version 'MAJOR.MINOR.PATCH'".to_string(),
            actual: version.to_string(),
        })
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .unwrap_or_else(|_| "<unrenderable>".to_string())
            .trim_end()
            .to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{EnforcementLevel, PluginCategory};

    const MINIMAL: &str = "\
api_version: domain.dev/v1
metadata:
  name: orders
  version: 1.0.0
  owner: data@acme.example
";

    #[test]
    fn load_minimal_two_tier_manifest() {
        let manifest = ManifestLoader::load(MINIMAL.as_bytes()).unwrap();
        assert!(manifest.is_self_contained());
        assert_eq!(manifest.metadata.name, "orders");
        assert!(manifest.governance.policy_enforcement_level.is_none());
    }

    #[test]
    fn load_accepts_json_encoding() {
        let json = r#"{
            "api_version": "domain.dev/v1",
            "metadata": {"name": "orders", "version": "1.0.0", "owner": "data@acme.example"},
            "governance": {"policy_enforcement_level": "strict"}
        }"#;
        let manifest = ManifestLoader::load(json.as_bytes()).unwrap();
        assert_eq!(
            manifest.governance.policy_enforcement_level,
            Some(EnforcementLevel::Strict)
        );
    }

    #[test]
    fn load_full_domain_manifest() {
        let doc = "\
api_version: domain.dev/v1
scope: domain
metadata:
  name: retail
  version: 2.1.0
  owner: retail@acme.example
parent_manifest: registry://acme/enterprise@3
approved_plugins:
  compute: [duckdb, spark]
approved_products: [orders]
governance:
  pii_encryption: required
  data_retention_days: 400
";
        let manifest = ManifestLoader::load(doc.as_bytes()).unwrap();
        assert_eq!(manifest.scope, Some(TierScope::Domain));
        assert_eq!(
            manifest.approved_plugins[&PluginCategory::Compute].len(),
            2
        );
        assert_eq!(manifest.governance.data_retention_days, Some(400));
    }

    #[test]
    fn missing_api_version_rejected() {
        let doc = "metadata: {name: a, version: 1.0.0, owner: o}";
        assert!(matches!(
            ManifestLoader::load(doc.as_bytes()),
            Err(SchemaError::MissingField { field }) if field == "api_version"
        ));
    }

    #[test]
    fn unsupported_api_major_rejected() {
        let doc = MINIMAL.replace("domain.dev/v1", "domain.dev/v2");
        assert!(matches!(
            ManifestLoader::load(doc.as_bytes()),
            Err(SchemaError::UnsupportedApiVersion { .. })
        ));
    }

    #[test]
    fn malformed_api_version_carries_field_path() {
        let doc = MINIMAL.replace("domain.dev/v1", "nonsense");
        assert!(matches!(
            ManifestLoader::load(doc.as_bytes()),
            Err(SchemaError::InvalidValue { field, .. }) if field == "api_version"
        ));
    }

    #[test]
    fn missing_metadata_owner_rejected() {
        let doc = "\
api_version: domain.dev/v1
metadata:
  name: orders
  version: 1.0.0
";
        assert!(matches!(
            ManifestLoader::load(doc.as_bytes()),
            Err(SchemaError::MissingField { field }) if field == "metadata.owner"
        ));
    }

    #[test]
    fn non_semver_metadata_version_rejected() {
        let doc = MINIMAL.replace("1.0.0", "1.0");
        assert!(matches!(
            ManifestLoader::load(doc.as_bytes()),
            Err(SchemaError::InvalidValue { field, .. }) if field == "metadata.version"
        ));
    }

    #[test]
    fn unknown_scope_treated_as_two_tier() {
        let doc = format!("{MINIMAL}scope: workspace\n");
        let manifest = ManifestLoader::load(doc.as_bytes()).unwrap();
        assert_eq!(manifest.scope, None);
        assert!(manifest.is_self_contained());
    }

    #[test]
    fn invalid_governance_enum_carries_field_path() {
        let doc = format!("{MINIMAL}governance:\n  policy_enforcement_level: maybe\n");
        assert!(matches!(
            ManifestLoader::load(doc.as_bytes()),
            Err(SchemaError::InvalidValue { field, .. })
                if field == "governance.policy_enforcement_level"
        ));
    }

    #[test]
    fn enterprise_with_parent_rejected() {
        let doc = format!(
            "{MINIMAL}scope: enterprise\nparent_manifest: registry://acme/root@1\n"
        );
        assert!(matches!(
            ManifestLoader::load(doc.as_bytes()),
            Err(SchemaError::InvalidValue { field, .. }) if field == "parent_manifest"
        ));
    }

    #[test]
    fn domain_without_parent_rejected() {
        let doc = format!("{MINIMAL}scope: domain\n");
        assert!(matches!(
            ManifestLoader::load(doc.as_bytes()),
            Err(SchemaError::MissingField { field }) if field == "parent_manifest"
        ));
    }

    #[test]
    fn oversized_document_rejected() {
        let mut doc = MINIMAL.to_string();
        doc.push_str("# ");
        doc.push_str(&"x".repeat(MAX_DOCUMENT_BYTES));
        assert!(matches!(
            ManifestLoader::load(doc.as_bytes()),
            Err(SchemaError::DocumentTooLarge { .. })
        ));
    }

    #[test]
    fn unparseable_document_rejected() {
        assert!(matches!(
            ManifestLoader::load(b"::: not yaml {{{"),
            Err(SchemaError::Malformed { .. })
        ));
    }
}
