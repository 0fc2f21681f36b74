// Severity classifier - 基于规则基础等级与上下文策略确定最终严重性

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::rules::{Rule, Severity};

/// One configurable upgrade. `rule` is a rule id or `*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementSpec {
    pub rule: String,
    /// Regex over enclosing declaration names; absent matches everywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosing: Option<String>,
    pub upgrade_to: Severity,
    /// Regex over the file name; a match disables the upgrade.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_paths: Option<String>,
}

/// What the classifier may look at besides the rule.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub enclosing_names: &'a [String],
    pub filename: &'a str,
}

#[derive(Debug)]
struct Refinement {
    rule: String,
    enclosing: Option<Regex>,
    upgrade_to: Severity,
    skip_paths: Option<Regex>,
}

impl Refinement {
    fn applies(&self, rule: &Rule, ctx: &MatchContext<'_>) -> bool {
        (self.rule == "*" || self.rule == rule.id)
            && self
                .enclosing
                .as_ref()
                .map_or(true, |re| ctx.enclosing_names.iter().any(|n| re.is_match(n)))
            && !self
                .skip_paths
                .as_ref()
                .is_some_and(|re| re.is_match(ctx.filename))
    }
}

/// Pure function of (rule, enclosing names, file name). Never returns less than the rule's base.
#[derive(Debug)]
pub struct SeverityClassifier {
    refinements: Vec<Refinement>,
}

impl SeverityClassifier {
    pub fn new(specs: &[RefinementSpec]) -> Result<Self> {
        let compile = |field: &str, pattern: &Option<String>| -> Result<Option<Regex>> {
            pattern
                .as_deref()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        CoreError::config(format!("severity policy: invalid {} regex: {}", field, e))
                    })
                })
                .transpose()
        };
        let refinements = specs
            .iter()
            .map(|spec| {
                if spec.rule.trim().is_empty() {
                    return Err(CoreError::config("severity policy entry without a rule"));
                }
                Ok(Refinement {
                    rule: spec.rule.clone(),
                    enclosing: compile("enclosing", &spec.enclosing)?,
                    upgrade_to: spec.upgrade_to,
                    skip_paths: compile("skip_paths", &spec.skip_paths)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { refinements })
    }

    pub fn builtin() -> Self {
        // the default policy is static and known to compile
        Self::new(&default_policy()).unwrap_or(Self {
            refinements: Vec::new(),
        })
    }

    pub fn classify(&self, rule: &Rule, ctx: &MatchContext<'_>) -> Severity {
        self.refinements
            .iter()
            .filter(|r| r.applies(rule, ctx))
            .map(|r| r.upgrade_to)
            .fold(rule.severity, Severity::max)
    }
}

impl Default for SeverityClassifier {
    fn default() -> Self {
        Self::builtin()
    }
}

pub fn default_policy() -> Vec<RefinementSpec> {
    vec![
        RefinementSpec {
            rule: "hardcoded-secret".to_string(),
            enclosing: Some(r"(?i)(auth|login|logon|signin|sign_in|credential|session)".to_string()),
            upgrade_to: Severity::Critical,
            skip_paths: Some(
                r"(?i)(^|[/\\])(tests?|fixtures?|__tests__|testdata)([/\\])|(^|[/\\])(test_[^/\\]*|[^/\\]*(_test|\.test|\.spec|_spec)\.[a-z]+)$"
                    .to_string(),
            ),
        },
        RefinementSpec {
            rule: "weak-crypto".to_string(),
            enclosing: Some(r"(?i)(password|passwd|auth|token|credential)".to_string()),
            upgrade_to: Severity::High,
            skip_paths: None,
        },
    ]
}
