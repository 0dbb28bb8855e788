//! The `strata compile` subcommand.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use strata_core::resolve::ManifestResolver;
use strata_core::{CompilationPipeline, CompileRequest, TransformRecord};

use crate::collaborators::{FileCatalog, FileRegistry};
use crate::output;

/// Arguments for one compile invocation.
#[derive(Debug)]
pub struct CompileArgs {
    /// Path to the leaf manifest document.
    pub manifest: PathBuf,

    /// Optional path to a JSON list of transform records.
    pub transforms: Option<PathBuf>,

    /// Repository requesting the compilation.
    pub repo: String,

    /// Directory parent URIs resolve under.
    pub registry_root: PathBuf,

    /// Catalog state file; defaults to `catalog.json` under the registry
    /// root.
    pub catalog_state: Option<PathBuf>,

    /// Bounded timeout for a single parent fetch, in seconds.
    pub fetch_timeout_secs: u64,

    /// Emit the report as JSON instead of text.
    pub json: bool,
}

/// Runs a compilation and returns the process exit code.
pub fn run(args: &CompileArgs) -> Result<i32> {
    let document = std::fs::read(&args.manifest)
        .with_context(|| format!("failed to read manifest '{}'", args.manifest.display()))?;
    let transforms = read_transforms(args.transforms.as_deref())?;

    let catalog_path = args
        .catalog_state
        .clone()
        .unwrap_or_else(|| args.registry_root.join("catalog.json"));
    debug!(
        registry_root = %args.registry_root.display(),
        catalog = %catalog_path.display(),
        transforms = transforms.len(),
        "compiling manifest"
    );

    let resolver = ManifestResolver::with_fetch_timeout(
        FileRegistry::new(&args.registry_root),
        Duration::from_secs(args.fetch_timeout_secs),
    );
    let pipeline = CompilationPipeline::with_resolver(resolver, FileCatalog::new(catalog_path));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    let report = runtime.block_on(pipeline.compile(CompileRequest {
        document: &document,
        transforms: &transforms,
        requesting_repo: &args.repo,
    }));

    output::render(&report, args.json)?;
    Ok(report.exit_code())
}

fn read_transforms(path: Option<&std::path::Path>) -> Result<Vec<TransformRecord>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read transforms '{}'", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("transforms '{}' is not a JSON list of records", path.display()))
}
