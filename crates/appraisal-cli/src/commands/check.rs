//! `appraisal check` command implementation.
//!
//! Validates a rule catalog:
//! - JSON Schema validation against `schemas/RuleCatalog.schema.json`
//! - Semantic checks (duplicate rule codes and ids, malformed rules)

use anyhow::{Context, Result};
use appraisal_core::{CatalogIssue, RuleCatalogDefinition};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

/// Embedded so validation works without external files.
const RULE_CATALOG_SCHEMA: &str = include_str!("../../../../schemas/RuleCatalog.schema.json");

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Check that produced the finding.
    pub category: &'static str,
    pub message: String,
    /// Location within the file (e.g. "/templates/annual/0").
    pub location: Option<String>,
}

impl CheckFinding {
    fn error(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            message: message.into(),
            location: None,
        }
    }

    fn warning(category: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            message: message.into(),
            location: None,
        }
    }

    fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl From<CatalogIssue> for CheckFinding {
    fn from(issue: CatalogIssue) -> Self {
        match issue {
            CatalogIssue::TemplateMismatch { .. } => Self::warning("catalog", issue.to_string()),
            CatalogIssue::DuplicateRuleCode { .. }
            | CatalogIssue::DuplicateRuleId { .. }
            | CatalogIssue::MalformedRule { .. } => Self::error("catalog", issue.to_string()),
        }
    }
}

/// Run every check on catalog content.
pub fn check_catalog(content: &str) -> Result<Vec<CheckFinding>> {
    let mut findings = validate_against_schema(content)?;

    // Semantic checks only make sense on a catalog that parses
    if findings.is_empty() {
        match RuleCatalogDefinition::from_yaml(content) {
            Ok(catalog) => findings.extend(catalog.validate().into_iter().map(CheckFinding::from)),
            Err(e) => findings.push(CheckFinding::error("parse", e.to_string())),
        }
    }

    Ok(findings)
}

fn validate_against_schema(content: &str) -> Result<Vec<CheckFinding>> {
    let mut findings = Vec::new();

    let schema: JsonValue =
        serde_json::from_str(RULE_CATALOG_SCHEMA).context("Embedded catalog schema is not JSON")?;

    let instance: JsonValue = match serde_yaml::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            findings.push(CheckFinding::error(
                "json-schema",
                format!("Failed to parse YAML: {}", e),
            ));
            return Ok(findings);
        }
    };

    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            findings.push(CheckFinding::error(
                "json-schema",
                format!("Failed to compile JSON schema: {}", e),
            ));
            return Ok(findings);
        }
    };

    for error in validator.iter_errors(&instance) {
        let path = error.instance_path().to_string();
        let location = if path.is_empty() {
            "(root)".to_string()
        } else {
            path
        };
        findings.push(CheckFinding::error("json-schema", error.to_string()).with_location(location));
    }

    Ok(findings)
}

fn print_finding(finding: &CheckFinding) {
    let icon = match finding.severity {
        Severity::Error => "✗",
        Severity::Warning => "⚠",
    };
    let location = finding
        .location
        .as_ref()
        .map(|l| format!(" [{}]", l))
        .unwrap_or_default();

    println!(
        "  {} {} [{}]{}: {}",
        icon, finding.severity, finding.category, location, finding.message
    );
}

/// Run `appraisal check <catalog>`.
pub fn run(catalog_path: &Path) -> Result<()> {
    println!("🔍 Checking rule catalog {}...", catalog_path.display());

    let content = fs::read_to_string(catalog_path)
        .with_context(|| format!("Failed to read {}", catalog_path.display()))?;
    let mut findings = check_catalog(&content)?;
    findings.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.category.cmp(b.category)));

    for finding in &findings {
        print_finding(finding);
    }

    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    println!();
    if findings.is_empty() {
        println!("✅ All checks passed!");
    } else {
        println!(
            "Summary: {} error(s), {} warning(s)",
            errors,
            findings.len() - errors
        );
    }

    if errors > 0 {
        anyhow::bail!("rule catalog has {} error(s)", errors);
    }
    Ok(())
}
