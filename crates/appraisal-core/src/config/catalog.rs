//! Rule catalog definition.
//!
//! The catalog groups action rules by appraisal template:
//!
//! ```yaml
//! version: "1.0.0"
//! templates:
//!   annual-review:
//!     - id: r-low-goals
//!       rule_code: LOW_GOALS
//!       condition_type: score_below
//!       condition_section: goals
//!       condition_operator: "<"
//!       condition_threshold: 3
//!       action_type: block_finalization
//!       action_is_mandatory: true
//! ```
//!
//! Rules may omit `template_id`; it is filled from the template key on load.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

use super::ConfigError;
use crate::error::CoreError;
use crate::rule::ActionRule;

/// Action rules per template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCatalogDefinition {
    /// Catalog version (semver format).
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub templates: BTreeMap<String, Vec<ActionRule>>,
}

impl Default for RuleCatalogDefinition {
    fn default() -> Self {
        Self {
            version: default_version(),
            templates: BTreeMap::new(),
        }
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl RuleCatalogDefinition {
    /// Load a catalog from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse a catalog from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut catalog: Self = serde_yaml::from_str(content)?;
        catalog.fill_template_ids();
        Ok(catalog)
    }

    fn fill_template_ids(&mut self) {
        for (template_id, rules) in self.templates.iter_mut() {
            for rule in rules.iter_mut().filter(|r| r.template_id.is_empty()) {
                rule.template_id = template_id.clone();
            }
        }
    }

    /// All rules of a template, active or not.
    pub fn rules(&self, template_id: &str) -> &[ActionRule] {
        self.templates
            .get(template_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Active rules of a template.
    pub fn active_rules(&self, template_id: &str) -> Vec<ActionRule> {
        self.rules(template_id)
            .iter()
            .filter(|r| r.is_active)
            .cloned()
            .collect()
    }

    /// Report every problem in the catalog.
    pub fn validate(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();
        let mut rule_ids: HashMap<&str, &str> = HashMap::new();

        for (template_id, rules) in &self.templates {
            let mut codes: BTreeMap<&str, usize> = BTreeMap::new();

            for rule in rules {
                *codes.entry(rule.rule_code.as_str()).or_default() += 1;

                if rule.template_id != *template_id {
                    issues.push(CatalogIssue::TemplateMismatch {
                        template_id: template_id.clone(),
                        rule_code: rule.rule_code.clone(),
                        declared: rule.template_id.clone(),
                    });
                }

                if let Some(other) = rule_ids.insert(rule.id.as_str(), template_id.as_str()) {
                    issues.push(CatalogIssue::DuplicateRuleId {
                        rule_id: rule.id.clone(),
                        first_template: other.to_string(),
                    });
                }

                if let Err(error) = rule.validate() {
                    issues.push(CatalogIssue::MalformedRule {
                        template_id: template_id.clone(),
                        error,
                    });
                }
            }

            for (code, count) in codes.into_iter().filter(|(_, n)| *n > 1) {
                issues.push(CatalogIssue::DuplicateRuleCode {
                    template_id: template_id.clone(),
                    rule_code: code.to_string(),
                    count,
                });
            }
        }

        issues
    }
}

/// A problem found in a rule catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogIssue {
    /// `rule_code` is repeated within one template.
    DuplicateRuleCode {
        template_id: String,
        rule_code: String,
        count: usize,
    },
    /// A rule id appears more than once in the catalog.
    DuplicateRuleId {
        rule_id: String,
        first_template: String,
    },
    /// A rule declares a template other than the one it is listed under.
    TemplateMismatch {
        template_id: String,
        rule_code: String,
        declared: String,
    },
    /// A rule cannot be evaluated.
    MalformedRule {
        template_id: String,
        error: CoreError,
    },
}

impl fmt::Display for CatalogIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogIssue::DuplicateRuleCode {
                template_id,
                rule_code,
                count,
            } => write!(
                f,
                "template '{}': rule_code '{}' is used by {} rules",
                template_id, rule_code, count
            ),
            CatalogIssue::DuplicateRuleId {
                rule_id,
                first_template,
            } => write!(
                f,
                "rule id '{}' is already defined in template '{}'",
                rule_id, first_template
            ),
            CatalogIssue::TemplateMismatch {
                template_id,
                rule_code,
                declared,
            } => write!(
                f,
                "template '{}': rule '{}' declares template '{}'",
                template_id, rule_code, declared
            ),
            CatalogIssue::MalformedRule { template_id, error } => {
                write!(f, "template '{}': {}", template_id, error)
            }
        }
    }
}
