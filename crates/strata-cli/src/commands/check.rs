//! The `strata check` subcommand: loader-only schema validation.

use std::path::Path;

use anyhow::{Context, Result};

use strata_core::ManifestLoader;

/// Validates a single manifest document and returns the process exit code.
///
/// Checking stops at the schema stage: parents are not fetched and no
/// policy runs, so this is safe to gate early in CI before a full compile.
pub fn run(manifest: &Path) -> Result<i32> {
    let bytes = std::fs::read(manifest)
        .with_context(|| format!("failed to read manifest '{}'", manifest.display()))?;

    match ManifestLoader::load(&bytes) {
        Ok(parsed) => {
            println!(
                "{}: ok ({} '{}' version {})",
                manifest.display(),
                parsed.tier_label(),
                parsed.metadata.name,
                parsed.metadata.version
            );
            Ok(0)
        },
        Err(error) => {
            println!("{}: {error}", manifest.display());
            Ok(1)
        },
    }
}
