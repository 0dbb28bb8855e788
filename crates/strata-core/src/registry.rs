//! Artifact registry collaborator and fetch coalescing.
//!
//! Parent manifest references are opaque URIs addressing versioned artifacts
//! in a remote registry. This engine never speaks a registry protocol; it
//! delegates byte retrieval to an [`ArtifactRegistry`] implementation and
//! wraps it in a [`CoalescingFetcher`] that guarantees:
//!
//! - at most one fetch is in flight per distinct URI; concurrent callers
//!   await the in-flight result instead of issuing duplicates
//! - every fetch observes a bounded timeout
//! - a cancelled or failed fetch leaves no partial state behind, so the
//!   next caller retries cleanly
//!
//! Caching fetched bytes across compilations is the registry
//! implementation's concern, not this module's; the resolver's own cache
//! (keyed by chain digest) makes repeat fetches rare.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, trace};

/// Default timeout applied to a single registry fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of distinct URIs with coalescing slots at once.
pub const MAX_IN_FLIGHT_URIS: usize = 1024;

// =============================================================================
// RegistryError
// =============================================================================

/// Errors from fetching a manifest artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// No artifact exists at the URI.
    #[error("artifact not found: '{uri}'")]
    NotFound {
        /// The URI that was requested.
        uri: String,
    },

    /// The registry backend failed.
    #[error("registry fetch failed for '{uri}': {message}")]
    Transport {
        /// The URI that was requested.
        uri: String,
        /// Backend diagnostic.
        message: String,
    },

    /// The fetch did not complete within the bounded timeout.
    #[error("registry fetch for '{uri}' timed out after {timeout_ms} ms")]
    Timeout {
        /// The URI that was requested.
        uri: String,
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// Too many distinct URIs are being fetched concurrently.
    #[error("too many concurrent fetches: {active} URIs in flight (max {max})")]
    TooManyInFlight {
        /// Number of URIs with active coalescing slots.
        active: usize,
        /// The configured maximum.
        max: usize,
    },
}

// =============================================================================
// ArtifactRegistry
// =============================================================================

/// Collaborator that retrieves raw manifest bytes by opaque URI.
///
/// Implementations must be safe for concurrent use and safely retryable:
/// the coalescing layer will re-invoke `fetch` after a failed or cancelled
/// attempt.
pub trait ArtifactRegistry: Send + Sync {
    /// Fetches the raw bytes of the artifact at `uri`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] for unknown URIs;
    /// [`RegistryError::Transport`] for backend failures.
    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Bytes, RegistryError>>;
}

impl<R: ArtifactRegistry + ?Sized> ArtifactRegistry for Arc<R> {
    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Bytes, RegistryError>> {
        (**self).fetch(uri)
    }
}

// =============================================================================
// MemoryRegistry
// =============================================================================

/// In-memory registry for tests and fixtures.
///
/// Counts fetches so suites can assert coalescing behavior, and can delay
/// responses to widen concurrency windows deterministically.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    entries: std::sync::RwLock<HashMap<String, Bytes>>,
    fetch_count: AtomicUsize,
    delay: Option<Duration>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry whose fetches sleep for `delay` before returning.
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Stores an artifact under `uri`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    pub fn insert(&self, uri: impl Into<String>, bytes: impl Into<Bytes>) {
        #[allow(clippy::unwrap_used)]
        self.entries.write().unwrap().insert(uri.into(), bytes.into());
    }

    /// Returns how many fetches have been issued against this registry.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

impl ArtifactRegistry for MemoryRegistry {
    fn fetch<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Bytes, RegistryError>> {
        Box::pin(async move {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            #[allow(clippy::unwrap_used)]
            let found = self.entries.read().unwrap().get(uri).cloned();
            found.ok_or_else(|| RegistryError::NotFound {
                uri: uri.to_string(),
            })
        })
    }
}

// =============================================================================
// CoalescingFetcher
// =============================================================================

/// Single-flight, timeout-bounded wrapper over an [`ArtifactRegistry`].
///
/// Each URI gets one in-flight slot; concurrent callers for the same URI
/// await the slot instead of fetching again. Slots are released when the
/// fetch settles, so this layer coalesces concurrency without becoming a
/// byte cache.
pub struct CoalescingFetcher<R> {
    registry: R,
    timeout: Duration,
    in_flight: Mutex<HashMap<String, Arc<OnceCell<Bytes>>>>,
}

impl<R: ArtifactRegistry> CoalescingFetcher<R> {
    /// Wraps `registry` with the default fetch timeout.
    pub fn new(registry: R) -> Self {
        Self::with_timeout(registry, DEFAULT_FETCH_TIMEOUT)
    }

    /// Wraps `registry` with an explicit fetch timeout.
    pub fn with_timeout(registry: R, timeout: Duration) -> Self {
        Self {
            registry,
            timeout,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Fetches `uri`, coalescing with any in-flight fetch of the same URI.
    ///
    /// Cancellation-safe: dropping this future while it holds the slot
    /// leaves the slot unfilled, and the next caller retries the fetch.
    ///
    /// # Errors
    ///
    /// Propagates the registry error, or [`RegistryError::Timeout`] when the
    /// bounded window elapses.
    pub async fn fetch(&self, uri: &str) -> Result<Bytes, RegistryError> {
        let cell = {
            let mut slots = self.in_flight.lock().await;
            if !slots.contains_key(uri) && slots.len() >= MAX_IN_FLIGHT_URIS {
                return Err(RegistryError::TooManyInFlight {
                    active: slots.len(),
                    max: MAX_IN_FLIGHT_URIS,
                });
            }
            Arc::clone(
                slots
                    .entry(uri.to_string())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let result = cell
            .get_or_try_init(|| async {
                trace!(uri, "issuing registry fetch");
                match tokio::time::timeout(self.timeout, self.registry.fetch(uri)).await {
                    Ok(result) => result,
                    Err(_) => Err(RegistryError::Timeout {
                        uri: uri.to_string(),
                        timeout_ms: self.timeout.as_millis() as u64,
                    }),
                }
            })
            .await
            .cloned();

        // Release the slot once the fetch settled. Late arrivals start a
        // fresh fetch; in-flight arrivals already hold the cell.
        {
            let mut slots = self.in_flight.lock().await;
            if let Some(current) = slots.get(uri) {
                if Arc::ptr_eq(current, &cell) {
                    slots.remove(uri);
                }
            }
        }

        if let Err(error) = &result {
            debug!(uri, %error, "registry fetch failed");
        }
        result
    }
}

// =============================================================================
// Tests
// =============================================================================
