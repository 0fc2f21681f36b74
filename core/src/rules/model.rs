use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ast::NodeKind;

/// Ordinal severity. `Critical` compares greatest.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three independently configurable rule sets.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RuleClass {
    Bug,
    Security,
    Style,
}

impl RuleClass {
    pub const ALL: [RuleClass; 3] = [RuleClass::Bug, RuleClass::Security, RuleClass::Style];
}

/// Class attached to a finding. `Diagnostic` marks synthetic failure findings.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FindingClass {
    Bug,
    Security,
    Style,
    Diagnostic,
}

impl From<RuleClass> for FindingClass {
    fn from(class: RuleClass) -> Self {
        match class {
            RuleClass::Bug => FindingClass::Bug,
            RuleClass::Security => FindingClass::Security,
            RuleClass::Style => FindingClass::Style,
        }
    }
}

/// An externally supplied rule definition, as written in YAML or JSON.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CustomRuleSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub message: Option<String>,
    pub severity: Severity,
    #[serde(default = "all_languages")]
    pub language: String,
    pub category: RuleClass,
    #[serde(default)]
    pub targets: Vec<NodeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub callee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub literal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub cwe: Option<String>,
}

fn all_languages() -> String {
    "all".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuleSetDocument {
    pub name: String,
    #[serde(default)]
    pub version: String,
    pub rules: Vec<CustomRuleSpec>,
}
