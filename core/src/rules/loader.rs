use std::fs;
use std::path::Path;

use regex::Regex;
use walkdir::WalkDir;

use crate::ast::{Language, NodeData, NodeKind};
use crate::error::{CoreError, Result};
use crate::rules::context::{binding_name, RuleContext};
use crate::rules::model::{CustomRuleSpec, RuleSetDocument};
use crate::rules::{Rule, RuleMatch};

/// Loads every `.yaml`/`.yml` rule file under `path`, in walk order.
pub fn load_rules_from_dir<P: AsRef<Path>>(path: P) -> Result<Vec<CustomRuleSpec>> {
    let mut rules = Vec::new();

    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|e| CoreError::config(format!("cannot walk rule directory: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if !is_yaml {
            continue;
        }
        let content = fs::read_to_string(path)?;
        let specs = parse_rules_document(&content)
            .map_err(|e| CoreError::config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("loaded {} rule(s) from {}", specs.len(), path.display());
        rules.extend(specs);
    }

    Ok(rules)
}

/// Parses a rule-set document first, then a single rule.
pub fn parse_rules_document(content: &str) -> Result<Vec<CustomRuleSpec>> {
    if let Ok(rule_set) = serde_yaml::from_str::<RuleSetDocument>(content) {
        return Ok(rule_set.rules);
    }
    serde_yaml::from_str::<CustomRuleSpec>(content)
        .map(|rule| vec![rule])
        .map_err(|e| CoreError::config(format!("not a rule or rule set: {}", e)))
}

enum Matcher {
    Callee(Regex),
    Identifier(Regex),
    Literal(Regex),
    Pattern(Regex),
}

impl Matcher {
    fn default_targets(&self) -> Vec<NodeKind> {
        match self {
            Matcher::Callee(_) => vec![NodeKind::Call],
            Matcher::Identifier(_) => vec![NodeKind::Declaration, NodeKind::Assignment],
            Matcher::Literal(_) => vec![NodeKind::Literal],
            Matcher::Pattern(_) => Vec::new(),
        }
    }

    fn find(&self, ctx: &RuleContext<'_>) -> Option<String> {
        let node = ctx.node;
        let subject = match self {
            Matcher::Callee(re) => match &node.data {
                NodeData::Call { callee, name, .. } => {
                    return [callee, name]
                        .into_iter()
                        .find(|s| re.is_match(s))
                        .cloned();
                }
                _ => None,
            },
            Matcher::Identifier(_) => binding_name(node).or_else(|| node.declared_name()),
            Matcher::Literal(_) => node.string_value(),
            Matcher::Pattern(_) => Some(ctx.node_text(node)),
        }?;
        let re = match self {
            Matcher::Callee(re) | Matcher::Identifier(re) | Matcher::Literal(re) | Matcher::Pattern(re) => re,
        };
        re.find(subject).map(|m| m.as_str().to_string())
    }
}

fn compile_regex(rule_id: &str, field: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| CoreError::config(format!("rule `{}`: invalid {} regex: {}", rule_id, field, e)))
}

/// Compiles an external rule definition into an ordinary rule.
pub fn compile_custom_rule(spec: &CustomRuleSpec) -> Result<Rule> {
    if spec.id.trim().is_empty() {
        return Err(CoreError::config("custom rule without an id"));
    }

    let mut matchers = Vec::new();
    if let Some(p) = &spec.callee {
        matchers.push(Matcher::Callee(compile_regex(&spec.id, "callee", p)?));
    }
    if let Some(p) = &spec.identifier {
        matchers.push(Matcher::Identifier(compile_regex(&spec.id, "identifier", p)?));
    }
    if let Some(p) = &spec.literal {
        matchers.push(Matcher::Literal(compile_regex(&spec.id, "literal", p)?));
    }
    if let Some(p) = &spec.pattern {
        matchers.push(Matcher::Pattern(compile_regex(&spec.id, "pattern", p)?));
    }
    if matchers.len() != 1 {
        return Err(CoreError::config(format!(
            "rule `{}` must declare exactly one of callee, identifier, literal, pattern",
            spec.id
        )));
    }
    let matcher = matchers.remove(0);

    let targets = if spec.targets.is_empty() {
        matcher.default_targets()
    } else {
        spec.targets.clone()
    };
    if targets.is_empty() {
        return Err(CoreError::config(format!(
            "rule `{}` uses a pattern matcher and must list its targets",
            spec.id
        )));
    }

    let languages = match spec.language.to_lowercase().as_str() {
        "all" | "*" => None,
        tag => Some(vec![tag.parse::<Language>().map_err(|_| {
            CoreError::config(format!("rule `{}`: unknown language `{}`", spec.id, spec.language))
        })?]),
    };

    let message = spec.message.clone().unwrap_or_else(|| spec.description.clone());
    let mut rule = Rule::new(&spec.id, spec.category, spec.severity, &targets, move |ctx| {
        matcher
            .find(ctx)
            .map(|m| vec![RuleMatch::here().with("match", m)])
            .unwrap_or_default()
    })
    .named(&spec.name)
    .message(if message.is_empty() { &spec.name } else { &message })
    .explanation(&spec.description);
    rule.languages = languages;
    if let Some(suggestion) = &spec.suggestion {
        rule = rule.suggestion(suggestion);
    }
    if let Some(cwe) = &spec.cwe {
        rule = rule.cwe(cwe);
    }
    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleClass, Severity};
    use std::io::Write;

    const RULE_SET: &str = r#"
name: team-rules
version: "1.2"
rules:
  - id: no-eval
    name: Avoid eval
    description: eval runs arbitrary code
    severity: high
    category: security
    language: javascript
    callee: "^eval$"
  - id: todo-marker
    name: TODO left behind
    description: "Found {match}"
    severity: low
    category: style
    literal: "TODO"
"#;

    #[test]
    fn parses_rule_sets_and_single_rules() {
        let specs = parse_rules_document(RULE_SET).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].category, RuleClass::Security);
        assert_eq!(specs[1].language, "all");

        let single = "id: one\nname: One\nseverity: medium\ncategory: bug\npattern: foo\ntargets: [call]\n";
        let specs = parse_rules_document(single).unwrap();
        assert_eq!(specs[0].severity, Severity::Medium);
        assert_eq!(specs[0].targets, vec![NodeKind::Call]);
    }

    #[test]
    fn loads_yaml_files_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("team.yaml")).unwrap();
        f.write_all(RULE_SET.as_bytes()).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let specs = load_rules_from_dir(dir.path()).unwrap();
        let ids: Vec<&str> = specs.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["no-eval", "todo-marker"]);
    }

    #[test]
    fn broken_file_is_configuration_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.yml"), "rules: [oops").unwrap();
        assert!(matches!(
            load_rules_from_dir(dir.path()),
            Err(CoreError::ConfigurationInvalid(_))
        ));
    }

    #[test]
    fn compiles_with_default_targets() {
        let specs = parse_rules_document(RULE_SET).unwrap();
        let rule = compile_custom_rule(&specs[0]).unwrap();
        assert_eq!(rule.targets, vec![NodeKind::Call]);
        assert!(rule.applies_to(Language::JavaScript));
        assert!(!rule.applies_to(Language::Python));
        assert_eq!(rule.message, "eval runs arbitrary code");
    }

    #[test]
    fn rejects_bad_definitions() {
        let base = parse_rules_document(RULE_SET).unwrap().remove(0);

        let bad_regex = CustomRuleSpec {
            callee: Some("(".to_string()),
            ..base.clone()
        };
        assert!(compile_custom_rule(&bad_regex).is_err());

        let two_matchers = CustomRuleSpec {
            literal: Some("x".to_string()),
            ..base.clone()
        };
        assert!(compile_custom_rule(&two_matchers).is_err());

        let bad_language = CustomRuleSpec {
            language: "cobol".to_string(),
            ..base.clone()
        };
        assert!(compile_custom_rule(&bad_language).is_err());

        let untargeted_pattern = CustomRuleSpec {
            callee: None,
            pattern: Some("x".to_string()),
            ..base
        };
        assert!(compile_custom_rule(&untargeted_pattern).is_err());
    }
}
