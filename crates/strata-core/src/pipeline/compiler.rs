//! Pipeline orchestration: sequences loader, resolver, enforcer, and
//! namespace claim into one run.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::manifest::{EnforcementLevel, ManifestLoader};
use crate::namespace::{CatalogProvisioner, NamespaceClaimValidator};
use crate::policy::{PolicyEnforcer, PolicyViolation, Severity, TransformRecord, ViolationKind};
use crate::registry::ArtifactRegistry;
use crate::resolve::{ImmutabilityViolation, ManifestResolver, ResolutionError};

use super::artifacts::CompiledArtifacts;
use super::report::{
    CompilationReport, FailureDiagnostic, FailureKind, PipelineStage, ViolationSummary,
};

// =============================================================================
// CompileRequest
// =============================================================================

/// One compilation invocation: the leaf document plus the externally
/// supplied context the engine never computes itself.
#[derive(Debug, Clone)]
pub struct CompileRequest<'a> {
    /// Raw bytes of the leaf manifest document.
    pub document: &'a [u8],

    /// Transform metadata supplied by the build harness.
    pub transforms: &'a [TransformRecord],

    /// The repository requesting compilation; owns any namespace claim.
    pub requesting_repo: &'a str,
}

// =============================================================================
// CompilationPipeline
// =============================================================================

/// Sequences the compilation stages, halting at the first fatal
/// diagnostic.
///
/// Stages run strictly in order: load, schema-validate, resolve, enforce
/// policy, claim the namespace and emit artifacts. Non-fatal policy
/// violations accumulate into the report; fatal errors move the run to
/// [`PipelineStage::Failed`] with everything gathered up to that point.
pub struct CompilationPipeline<R, C> {
    resolver: ManifestResolver<R>,
    claims: NamespaceClaimValidator<C>,
}

impl<R: ArtifactRegistry, C: CatalogProvisioner> CompilationPipeline<R, C> {
    /// Creates a pipeline over the two external collaborators.
    pub fn new(registry: R, catalog: C) -> Self {
        Self {
            resolver: ManifestResolver::new(registry),
            claims: NamespaceClaimValidator::new(catalog),
        }
    }

    /// Creates a pipeline around an existing resolver, sharing its cache
    /// and fetch configuration.
    pub fn with_resolver(resolver: ManifestResolver<R>, catalog: C) -> Self {
        Self {
            resolver,
            claims: NamespaceClaimValidator::new(catalog),
        }
    }

    /// Runs one compilation and reports the outcome.
    ///
    /// Never returns `Err`: every outcome, fatal or not, is a
    /// [`CompilationReport`] so callers always get the accumulated
    /// diagnostics.
    pub async fn compile(&self, request: CompileRequest<'_>) -> CompilationReport {
        let mut run = Run::start();
        debug!(run_id = %run.run_id, "compilation started");

        // Loaded: the raw document parses.
        let raw = match ManifestLoader::read(request.document) {
            Ok(raw) => raw,
            Err(error) => {
                return run.fail(FailureKind::Schema, PipelineStage::Loaded, error.to_string());
            },
        };

        // SchemaValid: the document passes field and invariant checks.
        let leaf = match raw.validate() {
            Ok(leaf) => leaf,
            Err(error) => {
                return run.fail(
                    FailureKind::Schema,
                    PipelineStage::SchemaValid,
                    error.to_string(),
                );
            },
        };
        run.product = Some(leaf.metadata.name.clone());

        // Resolved: the chain walks and folds.
        let resolved = match self.resolver.resolve(&leaf).await {
            Ok(resolved) => resolved,
            Err(error) => {
                if let ResolutionError::Immutability(violation) = &error {
                    run.violations.push(weakening_record(violation));
                }
                return run.fail(
                    FailureKind::Resolution,
                    PipelineStage::Resolved,
                    error.to_string(),
                );
            },
        };

        // PolicyChecked: every validator runs; strict mode gates fatality.
        let level = resolved.governance.policy_enforcement_level;
        run.enforcement_level = Some(level);
        run.violations
            .extend(PolicyEnforcer::enforce(&resolved, request.transforms, level));
        if PolicyEnforcer::blocks(level, &run.violations) {
            let errors = run
                .violations
                .iter()
                .filter(|v| v.severity == Severity::Error)
                .count();
            return run.fail(
                FailureKind::Policy,
                PipelineStage::PolicyChecked,
                format!("strict enforcement found {errors} error-severity policy violation(s)"),
            );
        }

        // ArtifactsEmitted: claim the namespace, then hand off.
        let claim = match &resolved.namespace {
            Some(namespace) => {
                match self
                    .claims
                    .validate_claim(namespace, request.requesting_repo)
                    .await
                {
                    Ok(claim) => Some(claim),
                    Err(error) => {
                        return run.fail(
                            FailureKind::Namespace,
                            PipelineStage::ArtifactsEmitted,
                            error.to_string(),
                        );
                    },
                }
            },
            None => None,
        };

        let artifacts = CompiledArtifacts::from_resolution(&resolved, claim);
        info!(
            run_id = %run.run_id,
            product = %artifacts.product.name,
            violations = run.violations.len(),
            "compilation emitted artifacts"
        );
        run.emit(artifacts)
    }
}

/// Renders an immutability violation into the report's violation list, so
/// the fatal resolution error is also visible where CI gates look.
fn weakening_record(violation: &ImmutabilityViolation) -> PolicyViolation {
    let (field, tier, parent, child) = match violation {
        ImmutabilityViolation::Weakened {
            field,
            tier,
            parent,
            child,
        }
        | ImmutabilityViolation::Altered {
            field,
            tier,
            parent,
            child,
        } => (field, tier, parent, child),
    };
    PolicyViolation::new(
        ViolationKind::SecurityWeakening,
        Severity::Error,
        field.clone(),
        format!("'{parent}' or stronger"),
        format!("'{child}' at tier '{tier}'"),
        "remove the declaration or match the parent chain's strength",
    )
}

// =============================================================================
// Run bookkeeping
// =============================================================================

/// Mutable state of one run, folded into the immutable report at the end.
struct Run {
    run_id: Uuid,
    started_at: chrono::DateTime<Utc>,
    product: Option<String>,
    enforcement_level: Option<EnforcementLevel>,
    violations: Vec<PolicyViolation>,
}

impl Run {
    fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            product: None,
            enforcement_level: None,
            violations: Vec::new(),
        }
    }

    fn fail(self, kind: FailureKind, stage: PipelineStage, message: String) -> CompilationReport {
        warn!(
            run_id = %self.run_id,
            kind = %kind,
            stage = %stage,
            message = %message,
            "compilation failed"
        );
        let summary = ViolationSummary::tally(&self.violations);
        CompilationReport {
            run_id: self.run_id,
            product: self.product,
            started_at: self.started_at,
            finished_at: Utc::now(),
            terminal_stage: PipelineStage::Failed,
            enforcement_level: self.enforcement_level,
            violations: self.violations,
            summary,
            failure: Some(FailureDiagnostic {
                kind,
                stage,
                message,
            }),
            artifacts: None,
        }
    }

    fn emit(self, artifacts: CompiledArtifacts) -> CompilationReport {
        let summary = ViolationSummary::tally(&self.violations);
        CompilationReport {
            run_id: self.run_id,
            product: self.product,
            started_at: self.started_at,
            finished_at: Utc::now(),
            terminal_stage: PipelineStage::ArtifactsEmitted,
            enforcement_level: self.enforcement_level,
            violations: self.violations,
            summary,
            failure: None,
            artifacts: Some(artifacts),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
