//! Manifest chain resolution: walking, merging, immutability, caching.
//!
//! Resolution turns one leaf [`crate::manifest::Manifest`] into an
//! immutable [`ResolvedManifest`]:
//!
//! 1. **Walk** the `parent_manifest` chain upward (product → domain →
//!    enterprise), fetching parents through the coalescing registry layer,
//!    rejecting cycles, missing parents, and incompatible API versions.
//! 2. **Fold** the chain from the root downward. Each field merges under
//!    the strategy declared in the [`FIELD_STRATEGIES`] table; the
//!    security-sensitive governance fields only accept equal-or-stronger
//!    child values, and a weakening attempt raises
//!    [`ImmutabilityViolation`].
//! 3. **Cache** the result keyed by a SHA-256 digest of the full chain, so
//!    repeated compilations of unchanged inputs skip the fold (and, with
//!    it, the parent fetches).
//!
//! Resolution is deterministic and idempotent: identical chain inputs
//! always produce structurally equal [`ResolvedManifest`] values.

mod cache;
mod chain;
mod merge;
mod resolver;

pub use cache::{ResolutionCache, DEFAULT_CACHE_CAPACITY};
pub use chain::MAX_CHAIN_DEPTH;
pub use merge::{strategy_for, ImmutabilityViolation, MergeStrategy, FIELD_STRATEGIES};
pub use resolver::{
    ManifestResolver, PluginFinding, ResolutionError, ResolvedManifest, TierRef,
};
