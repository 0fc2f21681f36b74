// Rules module - 规则模型、内置规则集与自定义规则加载

pub mod bug;
pub mod context;
pub mod loader;
pub mod model;
pub mod security;
pub mod style;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::ast::{Language, NodeKind, Span};
use crate::config::{AnalysisConfig, StyleLimits};
use crate::error::{CoreError, Result};

pub use context::RuleContext;
pub use loader::{compile_custom_rule, load_rules_from_dir, parse_rules_document};
pub use model::{CustomRuleSpec, FindingClass, RuleClass, RuleSetDocument, Severity};

pub type Predicate = Arc<dyn Fn(&RuleContext<'_>) -> Vec<RuleMatch> + Send + Sync>;

/// One hit reported by a predicate. `span` defaults to the visited node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleMatch {
    pub span: Option<Span>,
    pub values: BTreeMap<String, String>,
}

impl RuleMatch {
    pub fn here() -> Self {
        Self::default()
    }

    pub fn at(span: Span) -> Self {
        Self {
            span: Some(span),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }
}

/// A rule is data: metadata plus a pure predicate over the unified tree.
#[derive(Clone)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub version: String,
    pub class: RuleClass,
    pub severity: Severity,
    /// `None` applies to every language.
    pub languages: Option<Vec<Language>>,
    pub targets: Vec<NodeKind>,
    pub message: String,
    pub suggestion: Option<String>,
    pub explanation: String,
    pub cwe: Option<String>,
    predicate: Predicate,
}

impl Rule {
    pub fn new<F>(id: &str, class: RuleClass, severity: Severity, targets: &[NodeKind], predicate: F) -> Self
    where
        F: Fn(&RuleContext<'_>) -> Vec<RuleMatch> + Send + Sync + 'static,
    {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            version: "1.0".to_string(),
            class,
            severity,
            languages: None,
            targets: targets.to_vec(),
            message: String::new(),
            suggestion: None,
            explanation: String::new(),
            cwe: None,
            predicate: Arc::new(predicate),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn languages(mut self, languages: &[Language]) -> Self {
        self.languages = Some(languages.to_vec());
        self
    }

    pub fn message(mut self, template: &str) -> Self {
        self.message = template.to_string();
        self
    }

    pub fn suggestion(mut self, template: &str) -> Self {
        self.suggestion = Some(template.to_string());
        self
    }

    pub fn explanation(mut self, template: &str) -> Self {
        self.explanation = template.to_string();
        self
    }

    pub fn cwe(mut self, cwe: &str) -> Self {
        self.cwe = Some(cwe.to_string());
        self
    }

    pub fn applies_to(&self, language: Language) -> bool {
        self.languages
            .as_ref()
            .map_or(true, |langs| langs.contains(&language))
    }

    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<RuleMatch> {
        (self.predicate)(ctx)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("class", &self.class)
            .field("severity", &self.severity)
            .field("languages", &self.languages)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

/// Replaces `{key}` placeholders; unknown placeholders are left as written.
pub fn render(template: &str, values: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if values.contains_key(&after[..close]) => {
                out.push_str(&values[&after[..close]]);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Rules of one class, in registration order.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub class: RuleClass,
    pub rules: Vec<Arc<Rule>>,
}

/// Process-wide rule registry. Built once, then shared read-only.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    sets: Vec<RuleSet>,
    by_kind: HashMap<NodeKind, Vec<Arc<Rule>>>,
}

impl RuleRegistry {
    pub fn empty() -> Self {
        Self {
            sets: RuleClass::ALL
                .iter()
                .map(|class| RuleSet {
                    class: *class,
                    rules: Vec::new(),
                })
                .collect(),
            by_kind: HashMap::new(),
        }
    }

    /// Built-in bug, security and style sets.
    pub fn builtin(limits: &StyleLimits) -> Self {
        let mut registry = Self::empty();
        let rules = bug::rules()
            .into_iter()
            .chain(security::rules())
            .chain(style::rules(limits));
        for rule in rules {
            // built-in ids are unique
            let _ = registry.register(rule);
        }
        registry
    }

    /// Built-ins plus the configured custom rules, merged in order.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let mut registry = Self::builtin(&config.style);
        for spec in &config.custom_rules {
            registry.register(compile_custom_rule(spec)?)?;
        }
        tracing::debug!(
            "rule registry ready: {} rules ({} custom)",
            registry.len(),
            config.custom_rules.len()
        );
        Ok(registry)
    }

    /// Shared registry of the built-in rules with default limits.
    pub fn shared() -> Arc<RuleRegistry> {
        static SHARED: OnceLock<Arc<RuleRegistry>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(RuleRegistry::builtin(&StyleLimits::default())))
            .clone()
    }

    pub fn register(&mut self, rule: Rule) -> Result<()> {
        if self.get(&rule.id).is_some() {
            return Err(CoreError::config(format!("duplicate rule id `{}`", rule.id)));
        }
        if rule.targets.is_empty() {
            return Err(CoreError::config(format!("rule `{}` has no target kinds", rule.id)));
        }
        let rule = Arc::new(rule);
        for kind in &rule.targets {
            self.by_kind.entry(*kind).or_default().push(rule.clone());
        }
        if let Some(set) = self.sets.iter_mut().find(|s| s.class == rule.class) {
            set.rules.push(rule);
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Rule>> {
        self.sets
            .iter()
            .flat_map(|s| s.rules.iter())
            .find(|r| r.id == id)
    }

    pub fn set(&self, class: RuleClass) -> Option<&RuleSet> {
        self.sets.iter().find(|s| s.class == class)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.sets.iter().flat_map(|s| s.rules.iter())
    }

    pub fn len(&self) -> usize {
        self.sets.iter().map(|s| s.rules.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rules targeting `kind`, in registration order.
    pub fn for_kind(&self, kind: NodeKind) -> &[Arc<Rule>] {
        self.by_kind.get(&kind).map_or(&[], Vec::as_slice)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin(&StyleLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_known_placeholders() {
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), "fetch".to_string());
        assert_eq!(render("call to {name} in {scope}", &values), "call to fetch in {scope}");
        assert_eq!(render("no braces", &values), "no braces");
        assert_eq!(render("{name", &values), "{name");
    }

    #[test]
    fn builtin_registry_has_every_set() {
        let registry = RuleRegistry::shared();
        for class in RuleClass::ALL {
            assert!(!registry.set(class).unwrap().rules.is_empty(), "{:?} empty", class);
        }
        assert!(registry.get("unbounded-loop").is_some());
        assert!(registry
            .for_kind(NodeKind::Call)
            .iter()
            .any(|r| r.id == "sql-injection"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut registry = RuleRegistry::builtin(&StyleLimits::default());
        let dup = Rule::new("weak-crypto", RuleClass::Security, Severity::Low, &[NodeKind::Call], |_| {
            Vec::new()
        });
        assert!(matches!(
            registry.register(dup),
            Err(CoreError::ConfigurationInvalid(_))
        ));
    }
}
