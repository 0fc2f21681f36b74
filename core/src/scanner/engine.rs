// Rule engine - 单次前序遍历，对每个节点执行匹配其类型的所有规则

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ast::parser::panic_message;
use crate::ast::{NodeKind, Span, SyntaxNode};
use crate::error::{CoreError, Result};
use crate::rules::{Rule, RuleClass, RuleContext, RuleMatch, RuleRegistry};
use crate::scanner::SourceUnit;

const DEADLINE_CHECK_INTERVAL: usize = 512;

/// Per-file time budget.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    pub at: Instant,
    pub limit_ms: u64,
}

impl Deadline {
    pub fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now() + limit,
            limit_ms: limit.as_millis() as u64,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn check(&self) -> Result<()> {
        if Instant::now() >= self.at {
            return Err(CoreError::Timeout {
                limit_ms: self.limit_ms,
            });
        }
        Ok(())
    }
}

/// A predicate hit before severity classification.
#[derive(Debug, Clone)]
pub struct RawMatch {
    pub rule: Arc<Rule>,
    pub hit: RuleMatch,
    pub node_span: Span,
    /// Enclosing function and class names, outermost first.
    pub enclosing: Vec<String>,
}

/// Walks the tree once in pre-order and evaluates every active rule at each node.
///
/// A panicking predicate is logged and skipped; it never aborts the walk.
pub fn run_rules(
    unit: &SourceUnit,
    registry: &RuleRegistry,
    enabled: &[RuleClass],
    deadline: Option<Deadline>,
) -> Result<Vec<RawMatch>> {
    let active: HashMap<NodeKind, Vec<&Arc<Rule>>> = NodeKind::ALL
        .iter()
        .map(|kind| {
            let rules = registry
                .for_kind(*kind)
                .iter()
                .filter(|r| enabled.contains(&r.class) && r.applies_to(unit.language))
                .collect();
            (*kind, rules)
        })
        .collect();

    let mut matches = Vec::new();
    let mut ancestors: Vec<&SyntaxNode> = Vec::new();
    let mut stack: Vec<(&SyntaxNode, usize)> = vec![(&unit.tree.root, 0)];
    let mut visited = 0usize;

    while let Some((node, depth)) = stack.pop() {
        visited += 1;
        if visited % DEADLINE_CHECK_INTERVAL == 0 {
            if let Some(deadline) = &deadline {
                deadline.check()?;
            }
        }

        ancestors.truncate(depth);
        let rules = active.get(&node.kind()).map_or(&[][..], Vec::as_slice);
        if !rules.is_empty() {
            let ctx = RuleContext {
                node,
                ancestors: &ancestors,
                language: unit.language,
                source: &unit.content,
                filename: &unit.filename,
            };
            for rule in rules {
                match panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(&ctx))) {
                    Ok(hits) => {
                        if hits.is_empty() {
                            continue;
                        }
                        let enclosing: Vec<String> =
                            ctx.enclosing_names().into_iter().map(str::to_string).collect();
                        matches.extend(hits.into_iter().map(|hit| RawMatch {
                            rule: Arc::clone(rule),
                            hit,
                            node_span: node.span,
                            enclosing: enclosing.clone(),
                        }));
                    }
                    Err(payload) => {
                        let fault = CoreError::RuleEvaluation {
                            rule_id: rule.id.clone(),
                            message: panic_message(payload.as_ref()),
                        };
                        tracing::warn!(
                            "{} at {}:{}; rule skipped for this node",
                            fault,
                            unit.filename,
                            node.span.start_line
                        );
                    }
                }
            }
        }

        ancestors.push(node);
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }

    tracing::debug!(
        "{}: visited {} nodes, {} raw matches",
        unit.filename,
        visited,
        matches.len()
    );
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FrontEndRegistry, Language};
    use crate::rules::Severity;

    fn unit(code: &str, language: Language) -> SourceUnit {
        let tree = FrontEndRegistry::new().parse(code, language).unwrap();
        SourceUnit::new("t", code, language, tree)
    }

    #[test]
    fn panicking_rule_is_isolated() {
        let mut registry = RuleRegistry::empty();
        registry
            .register(Rule::new("explodes", RuleClass::Bug, Severity::Low, &[NodeKind::Call], |_| {
                panic!("predicate bug")
            }))
            .unwrap();
        registry
            .register(Rule::new("every-call", RuleClass::Bug, Severity::Low, &[NodeKind::Call], |_| {
                vec![RuleMatch::here()]
            }))
            .unwrap();

        let unit = unit("a()\nb()\n", Language::Python);
        let found = run_rules(&unit, &registry, &RuleClass::ALL, None).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|m| m.rule.id == "every-call"));
    }

    #[test]
    fn disabled_classes_and_languages_are_skipped() {
        let mut registry = RuleRegistry::empty();
        registry
            .register(
                Rule::new("java-only", RuleClass::Bug, Severity::Low, &[NodeKind::Call], |_| {
                    vec![RuleMatch::here()]
                })
                .languages(&[Language::Java]),
            )
            .unwrap();
        registry
            .register(Rule::new("style-call", RuleClass::Style, Severity::Low, &[NodeKind::Call], |_| {
                vec![RuleMatch::here()]
            }))
            .unwrap();

        let unit = unit("a()\n", Language::Python);
        let found = run_rules(&unit, &registry, &[RuleClass::Bug, RuleClass::Security], None).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn ancestors_and_enclosing_names() {
        let mut registry = RuleRegistry::empty();
        registry
            .register(Rule::new("calls", RuleClass::Bug, Severity::Low, &[NodeKind::Call], |ctx| {
                assert!(ctx.ancestors.iter().all(|a| a.span.contains(&ctx.node.span)));
                vec![RuleMatch::here().with("depth", ctx.ancestors.len().to_string())]
            }))
            .unwrap();

        let unit = unit("class Auth:\n    def login(self):\n        check()\n", Language::Python);
        let found = run_rules(&unit, &registry, &RuleClass::ALL, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].enclosing, vec!["Auth".to_string(), "login".to_string()]);
    }

    #[test]
    fn expired_deadline_times_out() {
        let code = "x = 1\n".repeat(600);
        let unit = unit(&code, Language::Python);
        let deadline = Deadline {
            at: Instant::now(),
            limit_ms: 0,
        };
        let err = run_rules(&unit, &RuleRegistry::shared(), &RuleClass::ALL, Some(deadline)).unwrap_err();
        assert!(matches!(err, CoreError::Timeout { limit_ms: 0 }));
    }
}
