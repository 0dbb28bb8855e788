//! Catalog namespace claims.
//!
//! A product requests a catalog namespace; the atomic compare-and-swap
//! that actually claims it belongs to an external catalog collaborator.
//! This module owns the claim *contract*: local syntax validation,
//! constructing the claim request, and interpreting the collaborator's
//! outcome. A namespace already owned by the requesting repository is a
//! success (idempotent re-compilation); a namespace owned by anyone else
//! is a fatal conflict that surfaces the owner contact.

use std::collections::HashMap;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Maximum number of dot-separated segments in a namespace.
pub const MAX_NAMESPACE_SEGMENTS: usize = 8;

// =============================================================================
// Collaborator contract
// =============================================================================

/// Outcome of a catalog claim attempt, as reported by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ClaimOutcome {
    /// The namespace was unclaimed and is now owned by the requester.
    Claimed,

    /// The namespace was already owned by the requesting repository.
    AlreadyOwnedBySelf,

    /// The namespace is owned by a different repository.
    OwnedByOther {
        /// The owning repository.
        owner_repo: String,
        /// Contact for the owning team, when the catalog records one.
        contact: Option<String>,
    },
}

/// Errors from the catalog backend itself (not claim conflicts).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("catalog claim failed: {message}")]
pub struct CatalogError {
    /// Backend diagnostic.
    pub message: String,
}

/// Collaborator performing the atomic namespace compare-and-swap.
pub trait CatalogProvisioner: Send + Sync {
    /// Claims `namespace` for `owner_repo`, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] only for backend failures; ownership
    /// conflicts are reported through [`ClaimOutcome`].
    fn claim_namespace<'a>(
        &'a self,
        namespace: &'a str,
        owner_repo: &'a str,
    ) -> BoxFuture<'a, Result<ClaimOutcome, CatalogError>>;
}

impl<C: CatalogProvisioner + ?Sized> CatalogProvisioner for std::sync::Arc<C> {
    fn claim_namespace<'a>(
        &'a self,
        namespace: &'a str,
        owner_repo: &'a str,
    ) -> BoxFuture<'a, Result<ClaimOutcome, CatalogError>> {
        (**self).claim_namespace(namespace, owner_repo)
    }
}

// =============================================================================
// Claim results and errors
// =============================================================================

/// A successful namespace claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimResult {
    /// The claimed namespace.
    pub namespace: String,

    /// True when this compilation claimed it fresh; false when the
    /// requesting repository already owned it.
    pub newly_claimed: bool,
}

/// The namespace is owned by another repository. Always fatal; never
/// gated by the enforcement level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "namespace '{namespace}' is already owned by '{owner_repo}'; \
     contact {contact} to request access or choose another namespace"
)]
pub struct NamespaceConflictError {
    /// The contested namespace.
    pub namespace: String,

    /// The owning repository.
    pub owner_repo: String,

    /// Owner contact, or a placeholder when the catalog records none.
    pub contact: String,
}

/// Errors from validating a namespace claim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum NamespaceClaimError {
    /// The namespace is owned by another repository.
    #[error(transparent)]
    Conflict(#[from] NamespaceConflictError),

    /// The namespace string is not syntactically valid.
    #[error("invalid namespace '{namespace}': {reason}")]
    InvalidNamespace {
        /// The offending namespace.
        namespace: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The catalog backend failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

// =============================================================================
// NamespaceClaimValidator
// =============================================================================

/// Validates and executes namespace claims through a catalog collaborator.
pub struct NamespaceClaimValidator<C> {
    catalog: C,
}

impl<C: CatalogProvisioner> NamespaceClaimValidator<C> {
    /// Wraps a catalog collaborator.
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Validates `namespace` syntax and claims it for `requesting_repo`.
    ///
    /// # Errors
    ///
    /// - [`NamespaceClaimError::InvalidNamespace`] before any collaborator
    ///   call, for syntactically invalid namespaces
    /// - [`NamespaceClaimError::Conflict`] when owned by another repository
    /// - [`NamespaceClaimError::Catalog`] for backend failures
    pub async fn validate_claim(
        &self,
        namespace: &str,
        requesting_repo: &str,
    ) -> Result<ClaimResult, NamespaceClaimError> {
        validate_syntax(namespace)?;

        match self.catalog.claim_namespace(namespace, requesting_repo).await? {
            ClaimOutcome::Claimed => {
                info!(namespace, repo = requesting_repo, "namespace claimed");
                Ok(ClaimResult {
                    namespace: namespace.to_string(),
                    newly_claimed: true,
                })
            },
            ClaimOutcome::AlreadyOwnedBySelf => {
                debug!(namespace, repo = requesting_repo, "namespace already owned");
                Ok(ClaimResult {
                    namespace: namespace.to_string(),
                    newly_claimed: false,
                })
            },
            ClaimOutcome::OwnedByOther { owner_repo, contact } => {
                Err(NamespaceConflictError {
                    namespace: namespace.to_string(),
                    owner_repo,
                    contact: contact.unwrap_or_else(|| "the owning team".to_string()),
                }
                .into())
            },
        }
    }
}

/// Namespace syntax: lowercase dotted segments of `[a-z0-9_]`, bounded.
fn validate_syntax(namespace: &str) -> Result<(), NamespaceClaimError> {
    let invalid = |reason: &str| NamespaceClaimError::InvalidNamespace {
        namespace: namespace.to_string(),
        reason: reason.to_string(),
    };

    if namespace.is_empty() {
        return Err(invalid("namespace is empty"));
    }
    let segments: Vec<&str> = namespace.split('.').collect();
    if segments.len() > MAX_NAMESPACE_SEGMENTS {
        return Err(invalid("too many segments"));
    }
    for segment in segments {
        if segment.is_empty() {
            return Err(invalid("empty segment"));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(invalid(
                "segments must be lowercase ascii letters, digits, or underscores",
            ));
        }
    }
    Ok(())
}

// =============================================================================
// MemoryCatalog
// =============================================================================

/// In-memory catalog collaborator for tests and fixtures.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    owners: std::sync::RwLock<HashMap<String, (String, Option<String>)>>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an existing ownership record.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    pub fn seed(
        &self,
        namespace: impl Into<String>,
        owner_repo: impl Into<String>,
        contact: Option<String>,
    ) {
        #[allow(clippy::unwrap_used)]
        self.owners
            .write()
            .unwrap()
            .insert(namespace.into(), (owner_repo.into(), contact));
    }
}

impl CatalogProvisioner for MemoryCatalog {
    fn claim_namespace<'a>(
        &'a self,
        namespace: &'a str,
        owner_repo: &'a str,
    ) -> BoxFuture<'a, Result<ClaimOutcome, CatalogError>> {
        Box::pin(async move {
            #[allow(clippy::unwrap_used)]
            let mut owners = self.owners.write().unwrap();
            match owners.get(namespace) {
                None => {
                    owners.insert(
                        namespace.to_string(),
                        (owner_repo.to_string(), None),
                    );
                    Ok(ClaimOutcome::Claimed)
                },
                Some((owner, _)) if owner == owner_repo => {
                    Ok(ClaimOutcome::AlreadyOwnedBySelf)
                },
                Some((owner, contact)) => Ok(ClaimOutcome::OwnedByOther {
                    owner_repo: owner.clone(),
                    contact: contact.clone(),
                }),
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
