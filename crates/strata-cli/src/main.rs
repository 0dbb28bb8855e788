//! strata - tiered governance manifest compiler.
//!
//! Compiles a product manifest against its domain and enterprise parents,
//! enforces governance policy, and emits the compiled artifacts boundary
//! object for downstream generators.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use strata_cli::commands;

/// strata - tiered governance manifest compiler
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for diagnostics reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text.
    Text,

    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a product manifest into artifacts
    Compile {
        /// Path to the leaf manifest document (YAML or JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Path to a JSON file of transform metadata records
        #[arg(short, long)]
        transforms: Option<PathBuf>,

        /// Repository requesting the compilation (owns namespace claims)
        #[arg(short, long, default_value = "local/workspace")]
        repo: String,

        /// Directory parent-manifest URIs are resolved under
        #[arg(long, default_value = ".")]
        registry_root: PathBuf,

        /// Path to the catalog ownership state file
        #[arg(long)]
        catalog_state: Option<PathBuf>,

        /// Seconds allowed for a single parent fetch
        #[arg(long, default_value_t = 10)]
        fetch_timeout_secs: u64,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Schema-validate a single manifest document without compiling
    Check {
        /// Path to the manifest document (YAML or JSON)
        #[arg(short, long)]
        manifest: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let exit_code = match cli.command {
        Commands::Compile {
            manifest,
            transforms,
            repo,
            registry_root,
            catalog_state,
            fetch_timeout_secs,
            format,
        } => commands::compile::run(&commands::compile::CompileArgs {
            manifest,
            transforms,
            repo,
            registry_root,
            catalog_state,
            fetch_timeout_secs,
            json: format == OutputFormat::Json,
        })?,
        Commands::Check { manifest } => commands::check::run(&manifest)?,
    };

    // Exit-code mapping for CI gates: zero violations or warn-level only is
    // success; any fatal stage is non-zero.
    std::process::exit(exit_code);
}
