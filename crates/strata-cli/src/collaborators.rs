//! File-backed implementations of the engine's collaborator traits.
//!
//! The core engine treats parent fetching and namespace claims as external
//! concerns behind traits. For local use and CI, this module provides:
//!
//! - [`FileRegistry`]: resolves parent-manifest URIs to files under a root
//!   directory.
//! - [`FileCatalog`]: a JSON state file recording namespace ownership, with
//!   in-process serialization standing in for the catalog's atomic
//!   compare-and-swap.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use bytes::Bytes;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

use strata_core::namespace::{CatalogError, CatalogProvisioner, ClaimOutcome};
use strata_core::registry::{ArtifactRegistry, RegistryError};

/// Extensions tried, in order, after the exact relative path.
const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

// =============================================================================
// FileRegistry
// =============================================================================

/// Resolves parent-manifest URIs to files under a root directory.
///
/// The scheme part of a URI (`registry://`) is dropped; the remainder is a
/// relative path under the root. `acme/enterprise@1` matches
/// `<root>/acme/enterprise@1` or the same path with a manifest extension.
/// Escaping the root (absolute paths, `..` components) is rejected as
/// not-found rather than read.
#[derive(Debug)]
pub struct FileRegistry {
    root: PathBuf,
}

impl FileRegistry {
    /// Creates a registry rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn relative_path(uri: &str) -> Option<PathBuf> {
        let rest = uri.split_once("://").map_or(uri, |(_, rest)| rest);
        let path = Path::new(rest);
        if rest.is_empty()
            || path.is_absolute()
            || path
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(path.to_path_buf())
    }

    fn locate(&self, uri: &str) -> Option<PathBuf> {
        let relative = Self::relative_path(uri)?;
        let exact = self.root.join(&relative);
        if exact.is_file() {
            return Some(exact);
        }
        let file_name = relative.file_name()?.to_string_lossy().into_owned();
        for extension in MANIFEST_EXTENSIONS {
            let candidate = self
                .root
                .join(relative.with_file_name(format!("{file_name}.{extension}")));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

impl ArtifactRegistry for FileRegistry {
    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Bytes, RegistryError>> {
        Box::pin(async move {
            let Some(path) = self.locate(uri) else {
                return Err(RegistryError::NotFound {
                    uri: uri.to_string(),
                });
            };
            debug!(uri, path = %path.display(), "resolving parent from file");
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(Bytes::from(bytes)),
                Err(error) => Err(RegistryError::Transport {
                    uri: uri.to_string(),
                    message: error.to_string(),
                }),
            }
        })
    }
}

// =============================================================================
// FileCatalog
// =============================================================================

/// One ownership record in the catalog state file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OwnerRecord {
    owner_repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contact: Option<String>,
}

/// The catalog state file layout.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CatalogState {
    #[serde(default)]
    namespaces: BTreeMap<String, OwnerRecord>,
}

/// A JSON state file recording namespace ownership.
///
/// Claims within one process are serialized by a mutex; the state file is
/// rewritten in full on every successful claim. Suitable for local
/// workflows and CI, not for a shared multi-writer catalog.
#[derive(Debug)]
pub struct FileCatalog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCatalog {
    /// Creates a catalog backed by the state file at `path`. A missing file
    /// reads as an empty catalog.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<CatalogState, CatalogError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| CatalogError {
                message: format!("catalog state file is corrupt: {e}"),
            }),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Ok(CatalogState::default())
            },
            Err(error) => Err(CatalogError {
                message: format!("failed to read catalog state: {error}"),
            }),
        }
    }

    fn store(&self, state: &CatalogState) -> Result<(), CatalogError> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| CatalogError {
            message: format!("failed to encode catalog state: {e}"),
        })?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CatalogError {
                    message: format!("failed to create catalog directory: {e}"),
                })?;
            }
        }
        std::fs::write(&self.path, bytes).map_err(|e| CatalogError {
            message: format!("failed to write catalog state: {e}"),
        })
    }
}

impl CatalogProvisioner for FileCatalog {
    fn claim_namespace<'a>(
        &'a self,
        namespace: &'a str,
        owner_repo: &'a str,
    ) -> BoxFuture<'a, Result<ClaimOutcome, CatalogError>> {
        Box::pin(async move {
            let guard = self.lock.lock().map_err(|_| CatalogError {
                message: "catalog lock poisoned".to_string(),
            })?;
            let mut state = self.load()?;
            let outcome = match state.namespaces.get(namespace) {
                Some(record) if record.owner_repo == owner_repo => {
                    ClaimOutcome::AlreadyOwnedBySelf
                },
                Some(record) => ClaimOutcome::OwnedByOther {
                    owner_repo: record.owner_repo.clone(),
                    contact: record.contact.clone(),
                },
                None => {
                    state.namespaces.insert(
                        namespace.to_string(),
                        OwnerRecord {
                            owner_repo: owner_repo.to_string(),
                            contact: None,
                        },
                    );
                    self.store(&state)?;
                    ClaimOutcome::Claimed
                },
            };
            drop(guard);
            Ok(outcome)
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
