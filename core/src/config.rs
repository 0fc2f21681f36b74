// Configuration - 分析配置（由外部加载，核心只负责解析与校验）

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::Language;
use crate::error::{CoreError, Result};
use crate::rules::{CustomRuleSpec, RuleClass, RuleRegistry, Severity};
use crate::scanner::severity::{RefinementSpec, SeverityClassifier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleLimits {
    pub max_function_lines: usize,
    pub max_nesting_depth: usize,
}

impl Default for StyleLimits {
    fn default() -> Self {
        Self {
            max_function_lines: 50,
            max_nesting_depth: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub enabled_checks: BTreeSet<RuleClass>,
    /// Findings below this level are dropped from the report.
    pub severity_threshold: Severity,
    pub languages: BTreeSet<Language>,
    pub custom_rules: Vec<CustomRuleSpec>,
    /// `None` uses the built-in policy; `Some(vec![])` disables refinement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_policy: Option<Vec<RefinementSpec>>,
    pub max_file_size: usize,
    pub timeout_ms: u64,
    pub parallel_processing: bool,
    pub max_workers: usize,
    pub style: StyleLimits,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled_checks: RuleClass::ALL.into_iter().collect(),
            severity_threshold: Severity::Low,
            languages: Language::ALL.into_iter().collect(),
            custom_rules: Vec::new(),
            severity_policy: None,
            max_file_size: 1_000_000,
            timeout_ms: 5_000,
            parallel_processing: true,
            max_workers: 4,
            style: StyleLimits::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| CoreError::config(format!("malformed YAML configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| CoreError::config(format!("malformed JSON configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `.json` files as JSON and anything else as YAML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.enabled_checks.is_empty() {
            return Err(CoreError::config("enabled_checks must name at least one rule set"));
        }
        if self.languages.is_empty() {
            return Err(CoreError::config("languages must not be empty"));
        }
        if self.max_workers == 0 {
            return Err(CoreError::config("max_workers must be at least 1"));
        }
        if self.timeout_ms == 0 {
            return Err(CoreError::config("timeout_ms must be greater than 0"));
        }
        if self.max_file_size == 0 {
            return Err(CoreError::config("max_file_size must be greater than 0"));
        }
        if self.style.max_function_lines == 0 || self.style.max_nesting_depth == 0 {
            return Err(CoreError::config("style limits must be greater than 0"));
        }
        RuleRegistry::from_config(self)?;
        if let Some(policy) = &self.severity_policy {
            SeverityClassifier::new(policy)?;
        }
        Ok(())
    }

    pub fn enabled_classes(&self) -> Vec<RuleClass> {
        self.enabled_checks.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_with_defaults() {
        let config = AnalysisConfig::from_yaml_str(
            "enabled_checks: [bug, security]\nseverity_threshold: medium\nmax_workers: 2\n",
        )
        .unwrap();
        assert_eq!(config.enabled_classes(), vec![RuleClass::Bug, RuleClass::Security]);
        assert_eq!(config.severity_threshold, Severity::Medium);
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.timeout_ms, 5_000);
        assert_eq!(config.languages.len(), 4);
    }

    #[test]
    fn json_with_custom_rules_and_policy() {
        let json = r#"{
            "languages": ["python", "java"],
            "custom_rules": [{
                "id": "no-print", "name": "No print", "severity": "low",
                "category": "style", "language": "python", "callee": "^print$"
            }],
            "severity_policy": [{"rule": "*", "enclosing": "^main$", "upgrade_to": "high"}],
            "style": {"max_nesting_depth": 2}
        }"#;
        let config = AnalysisConfig::from_json_str(json).unwrap();
        assert_eq!(config.custom_rules.len(), 1);
        assert_eq!(config.style.max_nesting_depth, 2);
        assert_eq!(config.style.max_function_lines, 50);
        assert!(config.languages.contains(&Language::Java));
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        for yaml in [
            "severity_threshold: severe\n",
            "enabled_checks: []\n",
            "max_workers: 0\n",
            "timeout_ms: 0\n",
            "languages: [cobol]\n",
            "enabled_checks: [performance]\n",
            "severity_policy: [{rule: '*', enclosing: '(', upgrade_to: high}]\n",
            "custom_rules: [{id: unbounded-loop, name: dup, severity: low, category: bug, callee: x}]\n",
        ] {
            assert!(
                matches!(AnalysisConfig::from_yaml_str(yaml), Err(CoreError::ConfigurationInvalid(_))),
                "accepted {:?}",
                yaml
            );
        }
    }

    #[test]
    fn reads_files_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("deepreview.json");
        std::fs::write(&json, r#"{"timeout_ms": 250}"#).unwrap();
        assert_eq!(AnalysisConfig::from_path(&json).unwrap().timeout_ms, 250);

        let yaml = dir.path().join("deepreview.yml");
        std::fs::write(&yaml, "parallel_processing: false\n").unwrap();
        assert!(!AnalysisConfig::from_path(&yaml).unwrap().parallel_processing);
    }
}
