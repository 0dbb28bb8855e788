//! Strata core engine: tiered manifest resolution and policy enforcement.
//!
//! Strata governs how a data platform's configuration is assembled before any
//! pipeline runs. Configuration is authored as manifest documents at up to
//! three tiers (enterprise, domain, product); this crate loads a leaf
//! document, walks its parent chain, merges the chain into one effective
//! configuration, and enforces governance policy against externally supplied
//! transform metadata.
//!
//! # Architecture
//!
//! ```text
//! raw bytes
//!     |
//!     v
//! ManifestLoader ---- SchemaError
//!     |
//!     v
//! ManifestResolver -- ResolutionError / ImmutabilityViolation
//!     |  (ArtifactRegistry fetches parents; fetches are coalesced,
//!     |   resolutions are cached by chain digest)
//!     v
//! PolicyEnforcer ---- PolicyViolation[]
//!     |
//!     v
//! CompilationPipeline -> CompiledArtifacts (boundary object)
//! ```
//!
//! # Security Model
//!
//! - **Strengthen-only inheritance**: a child tier may preserve or strengthen
//!   a parent's security-sensitive governance settings, never weaken them.
//!   Weakening raises [`resolve::ImmutabilityViolation`], which is fatal
//!   regardless of the enforcement level.
//! - **Whitelisted plugins**: a child tier may only select plugins that its
//!   parents approve; out-of-whitelist declarations surface as enforcement
//!   violations.
//! - **Fail-closed resolution**: cycles, missing parents, and incompatible
//!   API versions abort resolution before any merge output is produced.
//!
//! # External Collaborators
//!
//! Fetching manifest bytes ([`registry::ArtifactRegistry`]) and claiming
//! catalog namespaces ([`namespace::CatalogProvisioner`]) are collaborator
//! traits; this crate ships in-memory and file-backed implementations but
//! takes no position on the remote protocols behind them.

pub mod manifest;
pub mod namespace;
pub mod pipeline;
pub mod policy;
pub mod registry;
pub mod resolve;

pub use manifest::{
    ApiVersion, AuditLogging, EnforcementLevel, GovernanceSpec, Manifest, ManifestLoader,
    ManifestMetadata, PiiEncryption, PluginCategory, SchemaError, SchemaEvolutionPolicy,
    TierScope,
};
pub use namespace::{
    CatalogProvisioner, ClaimOutcome, ClaimResult, NamespaceClaimError, NamespaceClaimValidator,
    NamespaceConflictError,
};
pub use pipeline::{
    CompilationPipeline, CompilationReport, CompileRequest, CompiledArtifacts, FailureDiagnostic,
    FailureKind, PipelineStage, ViolationSummary, ARTIFACTS_SCHEMA_VERSION,
};
pub use policy::{
    PolicyEnforcer, PolicyViolation, Severity, TransformRecord, TransformSchema, ViolationKind,
};
pub use registry::{ArtifactRegistry, CoalescingFetcher, MemoryRegistry, RegistryError};
pub use resolve::{
    ImmutabilityViolation, ManifestResolver, MergeStrategy, ResolutionError, ResolvedManifest,
};
