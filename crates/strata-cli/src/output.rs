//! Report rendering for humans and CI gates.

use anyhow::Result;
use strata_core::{CompilationReport, Severity};

/// Renders a compilation report in the requested format to stdout.
pub fn render(report: &CompilationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let product = report.product.as_deref().unwrap_or("<unknown>");
    println!(
        "compilation {} for '{}': {}",
        report.run_id, product, report.terminal_stage
    );
    if let Some(level) = report.enforcement_level {
        println!("  enforcement level: {level}");
    }

    if report.violations.is_empty() {
        println!("  violations: none");
    } else {
        println!(
            "  violations: {} ({} error(s), {} warning(s))",
            report.summary.total, report.summary.errors, report.summary.warnings
        );
        for violation in &report.violations {
            let marker = match violation.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                _ => violation.severity.as_str(),
            };
            println!(
                "    {marker} [{}] {}: expected {}, got {}",
                violation.kind, violation.subject, violation.expected, violation.actual
            );
            println!("      hint: {}", violation.hint);
        }
    }

    if let Some(failure) = &report.failure {
        println!("  failed at {}: {}", failure.stage, failure.message);
    }

    if let Some(artifacts) = &report.artifacts {
        println!(
            "  artifacts: schema {} over chain {}",
            artifacts.artifacts_schema_version, artifacts.chain_digest
        );
        if let Some(claim) = &artifacts.namespace_claim {
            let how = if claim.newly_claimed {
                "newly claimed"
            } else {
                "already owned"
            };
            println!("  namespace: {} ({how})", claim.namespace);
        }
    }

    Ok(())
}
