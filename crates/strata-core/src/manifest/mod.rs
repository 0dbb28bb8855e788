//! Manifest document model and schema validation.
//!
//! A manifest is the unit of configuration at one tier of the inheritance
//! chain. This module defines the typed document model, the API version
//! compatibility window, and the loader that turns raw bytes into a
//! validated [`Manifest`].
//!
//! # Schema Overview
//!
//! ```yaml
//! api_version: domain.dev/v1
//! scope: domain
//! metadata:
//!   name: retail
//!   version: "1.4.0"
//!   owner: retail-platform@acme.example
//! parent_manifest: registry://acme/enterprise@3
//! approved_plugins:
//!   compute: [duckdb, snowflake]
//! approved_products:
//!   - orders
//!   - customers
//! governance:
//!   pii_encryption: required
//!   policy_enforcement_level: strict
//! ```
//!
//! Loading is schema-only: the loader has no knowledge of parent documents
//! and performs no I/O. Chain semantics live in [`crate::resolve`].

mod governance;
mod loader;
mod schema;
mod version;

pub use governance::{
    defaults, AuditLogging, ClassificationPolicy, EffectiveGovernance, EffectiveSla,
    EnforcementLevel, GovernanceFloors, GovernanceRule, GovernanceSpec, NamingPolicy,
    PiiEncryption, QualityGates, SchemaEvolutionPolicy, SlaThresholds,
    DEFAULT_SENSITIVE_PATTERNS,
};
pub use loader::{ManifestLoader, RawManifest, SchemaError, MAX_DOCUMENT_BYTES};
pub use schema::{
    Manifest, ManifestMetadata, PluginCategory, TierScope, MAX_CUSTOM_RULES, MAX_NAME_LENGTH,
    MAX_PLUGINS_PER_CATEGORY, MAX_SENSITIVE_PATTERNS,
};
pub use version::{ApiVersion, ApiVersionError, SUPPORTED_API_GROUP, SUPPORTED_API_MAJOR};
