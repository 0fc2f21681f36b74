// tests/integration_rules.rs
use deepreview_core::rules::RuleMatch;
use deepreview_core::scanner::engine::run_rules;
use deepreview_core::scanner::report::ReportBuilder;
use deepreview_core::scanner::SourceUnit;
use deepreview_core::{Finding, FrontEndRegistry, Language, NodeKind, Rule, RuleClass, RuleRegistry, Severity};

fn unit(code: &str, language: Language) -> SourceUnit {
    let tree = FrontEndRegistry::new().parse(code, language).unwrap();
    SourceUnit::new("sample", code, language, tree)
}

fn findings(unit: &SourceUnit, registry: &RuleRegistry) -> Vec<Finding> {
    run_rules(unit, registry, &RuleClass::ALL, None)
        .unwrap()
        .iter()
        .map(|m| Finding::from_match(unit, &m.rule, &m.hit, m.node_span, m.rule.severity))
        .collect()
}

#[test]
fn predicates_see_scope_markers() {
    let mut registry = RuleRegistry::empty();
    registry
        .register(
            Rule::new("call-scope", RuleClass::Bug, Severity::Low, &[NodeKind::Call], |ctx| {
                let function = ctx.enclosing_function().and_then(|f| f.declared_name()).unwrap_or("-");
                let in_loop = ctx.enclosing_loop().is_some();
                vec![RuleMatch::here()
                    .with("function", function)
                    .with("loop", in_loop.to_string())]
            })
            .message("{function}/{loop}"),
        )
        .unwrap();

    let code = "function outer(xs) {\n  for (const x of xs) {\n    handle(x);\n    const cb = () => inner(x);\n  }\n  done();\n}\n";
    let messages: Vec<String> = findings(&unit(code, Language::JavaScript), &registry)
        .into_iter()
        .map(|f| f.message)
        .collect();
    // the arrow function is a new function boundary, so its loop is not visible
    assert_eq!(messages, vec!["outer/true", "cb/false", "outer/false"]);
}

#[test]
fn rule_order_does_not_change_findings() {
    let code = "import hashlib\npassword = \"x1\"\nwhile True:\n    hashlib.md5(b'')\n";
    let unit = unit(code, Language::Python);
    let builtin = RuleRegistry::builtin(&Default::default());

    let mut reversed = RuleRegistry::empty();
    let mut rules: Vec<Rule> = builtin.rules().map(|r| (**r).clone()).collect();
    rules.reverse();
    for rule in rules {
        reversed.register(rule).unwrap();
    }

    let report = ReportBuilder::default();
    let mut a: Vec<String> = report
        .finalize(findings(&unit, &builtin))
        .into_iter()
        .map(|f| f.finding_id)
        .collect();
    let mut b: Vec<String> = report
        .finalize(findings(&unit, &reversed))
        .into_iter()
        .map(|f| f.finding_id)
        .collect();
    a.sort();
    b.sort();
    assert_eq!(a.len(), 3);
    assert_eq!(a, b);
}

#[test]
fn same_rule_and_span_is_reported_once() {
    let mut registry = RuleRegistry::empty();
    registry
        .register(
            Rule::new("whole-file", RuleClass::Style, Severity::Low, &[NodeKind::Call, NodeKind::Literal], |ctx| {
                let root = ctx.ancestors.first().copied().unwrap_or(ctx.node);
                vec![RuleMatch::at(root.span)]
            })
            .message("file-level"),
        )
        .unwrap();

    let unit = unit("a(1)\nb('x')\n", Language::Python);
    let raw = findings(&unit, &registry);
    assert!(raw.len() >= 4);
    let reported = ReportBuilder::default().finalize(raw);
    assert_eq!(reported.len(), 1);
}
