//! Plugin and product approval validator.
//!
//! Plugin findings recorded during the fold (child tiers declaring
//! plugins outside the parent whitelist) surface here as violations, so
//! resolution stays structurally successful while the enforcement level
//! decides fatality. The leaf's concrete plugin selection is additionally
//! checked against the effective whitelist, and the product itself must be
//! approved by its domain when the chain has one.

use crate::resolve::ResolvedManifest;

use super::violation::{PolicyViolation, Severity, ViolationKind};

/// Checks plugin whitelists and domain product approval.
pub(crate) fn check(resolved: &ResolvedManifest) -> Vec<PolicyViolation> {
    let mut violations = Vec::new();

    for finding in &resolved.plugin_findings {
        let approved = resolved
            .approved_plugins
            .get(&finding.category)
            .map(|set| {
                set.iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        violations.push(PolicyViolation::new(
            ViolationKind::PluginApproval,
            Severity::Error,
            format!("{}.{}", finding.category, finding.plugin),
            format!("a plugin approved upstream for '{}'", finding.category),
            format!("'{}' declared by '{}'", finding.plugin, finding.declared_by),
            format!("use an approved {} plugin ({approved})", finding.category),
        ));
    }

    for (category, plugin) in &resolved.plugin_selection {
        let Some(approved) = resolved.approved_plugins.get(category) else {
            // Unconstrained category: nothing to judge against.
            continue;
        };
        if !approved.contains(plugin) {
            violations.push(PolicyViolation::new(
                ViolationKind::PluginApproval,
                Severity::Error,
                format!("plugin_selection.{category}"),
                format!(
                    "one of: {}",
                    approved.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
                ),
                plugin.clone(),
                format!("select an approved {category} plugin"),
            ));
        }
    }

    if resolved.has_domain_tier && !resolved.approved_products.contains(&resolved.metadata.name) {
        violations.push(PolicyViolation::new(
            ViolationKind::ProductApproval,
            Severity::Error,
            resolved.metadata.name.clone(),
            "a product name listed in the domain's approved_products",
            resolved.metadata.name.clone(),
            "ask the domain owner to approve the product",
        ));
    }

    violations
}
