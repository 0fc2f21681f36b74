// Bug rule set - 不可达代码、死循环、无终止递归、越界、空引用、字符串引用比较

use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{DeclKind, Jump, Language, LiteralKind, LoopFlavor, NodeData, NodeKind, OtherShape, SyntaxNode};
use crate::rules::context::{arguments, is_plain_identifier, mentions, operands, RuleContext};
use crate::rules::{Rule, RuleClass, RuleMatch, Severity};

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "unreachable-code",
            RuleClass::Bug,
            Severity::Medium,
            &[NodeKind::Block],
            unreachable_code,
        )
        .named("Unreachable code after terminator")
        .message("{count} statement(s) after `{terminator}` can never run")
        .suggestion("Remove the dead statements or move them before `{terminator}`.")
        .explanation(
            "Control leaves the block at the `{terminator}` statement, so everything that \
             follows it in the same block is dead code. Dead code usually hides a logic error.",
        ),
        Rule::new(
            "unbounded-loop",
            RuleClass::Bug,
            Severity::Critical,
            &[NodeKind::Loop],
            unbounded_loop,
        )
        .named("Loop without exit")
        .message("Loop condition `{condition}` is always true and the body never breaks")
        .suggestion("Add a `break` for the exit condition or make the loop condition depend on state.")
        .explanation(
            "A loop whose condition is a constant truthy value only terminates through `break`. \
             Without one the loop spins forever and hangs the caller.",
        )
        .cwe("CWE-835"),
        Rule::new(
            "unbounded-recursion",
            RuleClass::Bug,
            Severity::High,
            &[NodeKind::Declaration],
            unbounded_recursion,
        )
        .named("Recursion without base case")
        .message("`{name}` calls itself with no guarding base case")
        .suggestion("Return early from `{name}` on a base case before the recursive call.")
        .explanation(
            "The recursive call to `{name}` is not preceded by a conditional that returns. \
             Unless the argument shrinks to a base case the call stack overflows.",
        )
        .cwe("CWE-674"),
        Rule::new(
            "off-by-one-bound",
            RuleClass::Bug,
            Severity::High,
            &[NodeKind::Loop],
            off_by_one_bound,
        )
        .named("Off-by-one loop bound")
        .message("Loop bound `{bound}` is inclusive of the length")
        .suggestion("Use `<` against the length (or drop the `+ 1`) so the last index is `len - 1`.")
        .explanation(
            "Indices run from 0 to length - 1. Iterating up to and including `{bound}` reads \
             one element past the end of the sequence.",
        )
        .cwe("CWE-193"),
        Rule::new(
            "null-risk-dereference",
            RuleClass::Bug,
            Severity::High,
            &[NodeKind::Other, NodeKind::Call],
            null_risk_dereference,
        )
        .named("Possible null dereference")
        .message("`{identifier}` may be null here; it comes from {origin}")
        .suggestion("Check `{identifier}` for null/None before using it.")
        .explanation(
            "`{identifier}` is produced by {origin}, which can yield null/None, and it is \
             dereferenced without a prior check in this scope.",
        )
        .cwe("CWE-476"),
        Rule::new(
            "string-reference-equality",
            RuleClass::Bug,
            Severity::High,
            &[NodeKind::Other],
            string_reference_equality,
        )
        .named("String compared by reference")
        .languages(&[Language::Java, Language::Python])
        .message("Strings compared with `{operator}` test identity, not content")
        .suggestion("{fix}")
        .explanation(
            "`{operator}` compares object identity. Two equal strings are not guaranteed to be \
             the same object, so the result depends on interning.",
        )
        .cwe("CWE-597"),
    ]
}

fn terminator_keyword(jump: Jump, language: Language) -> &'static str {
    match jump {
        Jump::Return => "return",
        Jump::Throw if language == Language::Python => "raise",
        Jump::Throw => "throw",
        Jump::Break => "break",
        Jump::Continue => "continue",
    }
}

/// Function declarations are hoisted in JavaScript and stay reachable.
fn is_hoisted(node: &SyntaxNode, language: Language) -> bool {
    matches!(language, Language::JavaScript | Language::TypeScript)
        && matches!(
            node.native_kind,
            "function_declaration" | "generator_function_declaration"
        )
}

fn unreachable_code(ctx: &RuleContext<'_>) -> Vec<RuleMatch> {
    let statements: Vec<&SyntaxNode> = ctx.node.statements().collect();
    let Some((pos, jump)) = statements
        .iter()
        .enumerate()
        .find_map(|(i, s)| s.jump().map(|j| (i, j)))
    else {
        return Vec::new();
    };
    let keyword = terminator_keyword(jump, ctx.language);

    let mut matches = Vec::new();
    let mut run: Vec<&SyntaxNode> = Vec::new();
    let mut flush = |run: &mut Vec<&SyntaxNode>| {
        if let (Some(first), Some(last)) = (run.first(), run.last()) {
            matches.push(
                RuleMatch::at(first.span.merge(&last.span))
                    .with("terminator", keyword)
                    .with("count", run.len().to_string()),
            );
        }
        run.clear();
    };
    for &stmt in &statements[pos + 1..] {
        if is_hoisted(stmt, ctx.language) {
            flush(&mut run);
        } else {
            run.push(stmt);
        }
    }
    flush(&mut run);
    matches
}

fn is_truthy_constant(node: &SyntaxNode) -> bool {
    match &node.data {
        NodeData::Literal {
            kind: LiteralKind::Bool(value),
            ..
        } => *value,
        NodeData::Literal {
            kind: LiteralKind::Number,
            value,
        } => value
            .trim_start_matches("0x")
            .trim_start_matches("0X")
            .chars()
            .any(|c| c.is_ascii_digit() && c != '0'),
        _ => false,
    }
}

fn unbounded_loop(ctx: &RuleContext<'_>) -> Vec<RuleMatch> {
    let NodeData::Loop { flavor, .. } = ctx.node.data else {
        return Vec::new();
    };
    let condition = ctx.node.condition();
    let constant_true = match flavor {
        LoopFlavor::ForEach => false,
        LoopFlavor::For => condition.map_or(true, is_truthy_constant),
        LoopFlavor::While | LoopFlavor::DoWhile => condition.is_some_and(is_truthy_constant),
    };
    if !constant_true {
        return Vec::new();
    }

    let breaks = ctx
        .node
        .descendants_in_scope()
        .any(|n| n.jump() == Some(Jump::Break));
    if breaks {
        return Vec::new();
    }

    let condition = condition
        .map(|c| ctx.node_text(c).to_string())
        .unwrap_or_else(|| ";;".to_string());
    vec![RuleMatch::here().with("condition", condition)]
}

fn is_self_receiver(receiver: Option<&str>) -> bool {
    matches!(receiver, None | Some("this" | "self" | "cls"))
}

fn unbounded_recursion(ctx: &RuleContext<'_>) -> Vec<RuleMatch> {
    let function = ctx.node;
    let NodeData::Declaration {
        name: Some(name),
        decl: DeclKind::Function { params },
    } = &function.data
    else {
        return Vec::new();
    };

    let self_call = function.descendants_in_scope().find(|n| match &n.data {
        NodeData::Call {
            name: callee,
            receiver,
            constructor: false,
            ..
        } => {
            callee == name
                && is_self_receiver(receiver.as_deref())
                // java overloads delegate to each other under the same name
                && (ctx.language != Language::Java || arguments(n).len() == params.len())
        }
        _ => false,
    });
    let Some(call) = self_call else {
        return Vec::new();
    };

    let guarded = function.descendants_in_scope().any(|n| {
        let encloses = n.span.contains(&call.span) && n.span != call.span;
        match n.kind() {
            NodeKind::Conditional | NodeKind::Loop if encloses => true,
            NodeKind::Conditional => {
                n.span.start_byte < call.span.start_byte
                    && n.descendants_in_scope()
                        .any(|d| matches!(d.jump(), Some(Jump::Return | Jump::Throw)))
            }
            NodeKind::Other => {
                encloses
                    && matches!(n.binary_operator(), Some("&&" | "||" | "and" | "or" | "??"))
            }
            _ => false,
        }
    });
    if guarded {
        return Vec::new();
    }
    vec![RuleMatch::at(call.span).with("name", name.as_str())]
}

fn is_length_expr(node: &SyntaxNode) -> bool {
    match &node.data {
        NodeData::Other(OtherShape::Member { property, .. }) => {
            matches!(property.as_str(), "length" | "size" | "count")
        }
        NodeData::Call { name, .. } => matches!(name.as_str(), "len" | "size" | "length" | "count"),
        _ => false,
    }
}

fn off_by_one_bound(ctx: &RuleContext<'_>) -> Vec<RuleMatch> {
    let NodeData::Loop { flavor, .. } = ctx.node.data else {
        return Vec::new();
    };

    if flavor == LoopFlavor::ForEach {
        if ctx.language != Language::Python {
            return Vec::new();
        }
        // for i in range(len(xs) + 1)
        let range = ctx.node.children.iter().find(|c| {
            matches!(&c.data, NodeData::Call { callee, .. } if callee == "range")
        });
        let Some(bound) = range.and_then(|r| arguments(r).last().copied()) else {
            return Vec::new();
        };
        if bound.binary_operator() != Some("+") {
            return Vec::new();
        }
        let Some((left, right)) = operands(bound) else {
            return Vec::new();
        };
        let plus_one = |n: &SyntaxNode| {
            matches!(&n.data, NodeData::Literal { kind: LiteralKind::Number, value } if value == "1")
        };
        if (is_length_expr(left) && plus_one(right)) || (plus_one(left) && is_length_expr(right)) {
            return vec![RuleMatch::at(bound.span).with("bound", ctx.node_text(bound))];
        }
        return Vec::new();
    }

    let Some(condition) = ctx.node.condition() else {
        return Vec::new();
    };
    let Some((left, right)) = operands(condition) else {
        return Vec::new();
    };
    let bound = match condition.binary_operator() {
        Some("<=") if is_length_expr(right) => right,
        Some(">=") if is_length_expr(left) => left,
        _ => return Vec::new(),
    };
    vec![RuleMatch::at(condition.span).with("bound", ctx.node_text(bound))]
}

fn nullable_source() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(get|find|search|match|lookup|fetch|query|pop|load|read|select)([A-Z_].*)?$")
            .expect("nullable source pattern")
    })
}

/// Identifier dereferenced by `node`, if it is a member, index or java receiver access.
fn dereferenced(node: &SyntaxNode, language: Language) -> Option<&str> {
    let object = match &node.data {
        NodeData::Other(OtherShape::Member {
            object,
            optional: false,
            ..
        }) => object.as_str(),
        NodeData::Other(OtherShape::Index { object }) => object.as_str(),
        NodeData::Call {
            receiver: Some(receiver),
            ..
        } if language == Language::Java => receiver.as_str(),
        _ => return None,
    };
    if !is_plain_identifier(object) || matches!(object, "this" | "self" | "cls" | "super") {
        return None;
    }
    Some(object)
}

fn null_risk_dereference(ctx: &RuleContext<'_>) -> Vec<RuleMatch> {
    let Some(ident) = dereferenced(ctx.node, ctx.language) else {
        return Vec::new();
    };
    let use_at = ctx.node.span.start_byte;
    let scope = ctx.scope();

    let (origin_at, origin) = match ctx.last_binding(ident, use_at) {
        Some((binding, value)) => match value.map(|v| &v.data) {
            Some(NodeData::Call {
                name,
                constructor: false,
                ..
            }) if nullable_source().is_match(name) => (binding.span.end_byte, format!("`{}()`", name)),
            _ => return Vec::new(),
        },
        None => {
            let nullable_param = ctx.enclosing_function().is_some_and(|f| match &f.data {
                NodeData::Declaration {
                    decl: DeclKind::Function { params },
                    ..
                } => params.iter().any(|p| p.name == ident && p.nullable),
                _ => false,
            });
            if !nullable_param {
                return Vec::new();
            }
            (scope.span.start_byte, "a nullable parameter".to_string())
        }
    };

    let mut first_use = None;
    for n in scope.descendants_in_scope() {
        let start = n.span.start_byte;
        if start < origin_at || start > use_at {
            continue;
        }
        if start < use_at && is_null_guard(ctx, n, ident) {
            return Vec::new();
        }
        if first_use.is_none() && dereferenced(n, ctx.language) == Some(ident) {
            first_use = Some(start);
        }
    }
    if first_use != Some(use_at) {
        return Vec::new();
    }

    vec![RuleMatch::here()
        .with("identifier", ident)
        .with("origin", origin)]
}

fn is_null_guard(ctx: &RuleContext<'_>, node: &SyntaxNode, ident: &str) -> bool {
    match &node.data {
        NodeData::Conditional { .. } | NodeData::Loop { .. } => node
            .condition()
            .is_some_and(|c| mentions(ctx.node_text(c), ident)),
        NodeData::Other(OtherShape::Binary { operator }) => {
            matches!(operator.as_str(), "&&" | "||" | "and" | "or" | "??")
                && node
                    .statements()
                    .next()
                    .is_some_and(|left| mentions(ctx.node_text(left), ident))
        }
        NodeData::Call { name, .. } => {
            matches!(
                name.as_str(),
                "assert" | "requireNonNull" | "assertNotNull" | "checkNotNull" | "isinstance"
            ) && mentions(ctx.node_text(node), ident)
        }
        NodeData::Other(OtherShape::Generic) => {
            node.native_kind == "assert_statement" && mentions(ctx.node_text(node), ident)
        }
        _ => false,
    }
}

fn is_string_literal(node: &SyntaxNode) -> bool {
    matches!(node.native_kind, "string" | "string_literal")
        && matches!(node.data, NodeData::Literal { .. })
}

fn declared_type(ctx: &RuleContext<'_>, name: &str) -> Option<String> {
    if let Some((binding, _)) = ctx.last_binding(name, ctx.node.span.start_byte) {
        if let NodeData::Declaration {
            decl: DeclKind::Variable { type_name, .. },
            ..
        } = &binding.data
        {
            return type_name.clone();
        }
    }
    match &ctx.enclosing_function()?.data {
        NodeData::Declaration {
            decl: DeclKind::Function { params },
            ..
        } => params
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.type_name.clone()),
        _ => None,
    }
}

fn string_reference_equality(ctx: &RuleContext<'_>) -> Vec<RuleMatch> {
    let Some(operator) = ctx.node.binary_operator() else {
        return Vec::new();
    };
    let Some((left, right)) = operands(ctx.node) else {
        return Vec::new();
    };

    let (flagged, fix) = match ctx.language {
        Language::Java if matches!(operator, "==" | "!=") => {
            let is_null = |n: &SyntaxNode| {
                matches!(n.data, NodeData::Literal { kind: LiteralKind::Null, .. })
            };
            let is_string_var = |n: &SyntaxNode| {
                n.identifier()
                    .and_then(|id| declared_type(ctx, id))
                    .is_some_and(|t| t == "String")
            };
            let flagged = !is_null(left)
                && !is_null(right)
                && (is_string_literal(left)
                    || is_string_literal(right)
                    || (is_string_var(left) && is_string_var(right)));
            let negate = if operator == "!=" { "!" } else { "" };
            let fix = format!(
                "Use `{}{}.equals({})` to compare string contents.",
                negate,
                ctx.node_text(left),
                ctx.node_text(right)
            );
            (flagged, fix)
        }
        Language::Python if matches!(operator, "is" | "is not") => {
            let flagged = is_string_literal(left) || is_string_literal(right);
            let fix = format!(
                "Use `{}` to compare string values.",
                if operator == "is" { "==" } else { "!=" }
            );
            (flagged, fix)
        }
        _ => return Vec::new(),
    };

    if !flagged {
        return Vec::new();
    }
    vec![RuleMatch::here().with("operator", operator).with("fix", fix)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FrontEndRegistry;
    use crate::rules::RuleRegistry;
    use crate::scanner::engine::run_rules;
    use crate::scanner::SourceUnit;

    fn hits(code: &str, language: Language, rule_id: &str) -> Vec<RuleMatch> {
        let tree = FrontEndRegistry::new().parse(code, language).unwrap();
        let unit = SourceUnit::new("sample", code, language, tree);
        let registry = RuleRegistry::shared();
        run_rules(&unit, &registry, &RuleClass::ALL, None)
            .unwrap()
            .into_iter()
            .filter(|raw| raw.rule.id == rule_id)
            .map(|raw| raw.hit)
            .collect()
    }

    #[test]
    fn unreachable_run_is_reported_once() {
        let code = "def f():\n    return 1\n    x = 2\n    print(x)\n";
        let found = hits(code, Language::Python, "unreachable-code");
        assert_eq!(found.len(), 1);
        let span = found[0].span.unwrap();
        assert_eq!((span.start_line, span.end_line), (3, 4));
        assert_eq!(found[0].values["count"], "2");
    }

    #[test]
    fn hoisted_functions_after_return_are_fine() {
        let code = "function outer() {\n  return inner();\n  function inner() { return 1; }\n}\n";
        assert!(hits(code, Language::JavaScript, "unreachable-code").is_empty());
    }

    #[test]
    fn loop_with_nested_break_is_bounded() {
        let code = "while (true) {\n  if (done()) {\n    break;\n  }\n}\n";
        assert!(hits(code, Language::JavaScript, "unbounded-loop").is_empty());
        let code = "while (true) {\n  if (done()) {\n    log();\n  }\n}\n";
        assert_eq!(hits(code, Language::JavaScript, "unbounded-loop").len(), 1);
    }

    #[test]
    fn any_break_below_the_loop_counts_as_an_exit() {
        let code = "function pump(x) {\n  while (1) {\n    switch (x) {\n      case 1: break;\n    }\n  }\n}\n";
        assert!(hits(code, Language::JavaScript, "unbounded-loop").is_empty());
    }

    #[test]
    fn conditionless_for_is_unbounded() {
        let code = "class A { void spin() { for (;;) { tick(); } } }";
        assert_eq!(hits(code, Language::Java, "unbounded-loop").len(), 1);
    }

    #[test]
    fn break_inside_nested_function_does_not_count() {
        let code = "while True:\n    def helper():\n        for x in y:\n            break\n    helper()\n";
        assert_eq!(hits(code, Language::Python, "unbounded-loop").len(), 1);
    }

    #[test]
    fn recursion_needs_a_base_case() {
        let code = "def walk(n):\n    return walk(n - 1)\n";
        assert_eq!(hits(code, Language::Python, "unbounded-recursion").len(), 1);

        let code = "def walk(n):\n    if n <= 0:\n        return 0\n    return walk(n - 1)\n";
        assert!(hits(code, Language::Python, "unbounded-recursion").is_empty());
    }

    #[test]
    fn inclusive_length_bounds() {
        let code = "for (let i = 0; i <= items.length; i++) { use(items[i]); }";
        assert_eq!(hits(code, Language::JavaScript, "off-by-one-bound").len(), 1);

        let code = "for (let i = 0; i < items.length; i++) { use(items[i]); }";
        assert!(hits(code, Language::JavaScript, "off-by-one-bound").is_empty());

        let code = "for i in range(len(xs) + 1):\n    print(xs[i])\n";
        assert_eq!(hits(code, Language::Python, "off-by-one-bound").len(), 1);
    }

    #[test]
    fn unchecked_lookup_result_is_flagged_once() {
        let code = "def f(d):\n    user = d.get('u')\n    print(user.name)\n    print(user.email)\n";
        let found = hits(code, Language::Python, "null-risk-dereference");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].values["identifier"], "user");

        let code = "def f(d):\n    user = d.get('u')\n    if user is None:\n        return\n    print(user.name)\n";
        assert!(hits(code, Language::Python, "null-risk-dereference").is_empty());
    }

    #[test]
    fn nullable_parameter_dereference() {
        let code = "function f(opts = null) {\n  return opts.size;\n}\n";
        assert_eq!(hits(code, Language::JavaScript, "null-risk-dereference").len(), 1);
        let code = "function f(opts = null) {\n  return opts && opts.size;\n}\n";
        assert!(hits(code, Language::JavaScript, "null-risk-dereference").is_empty());
    }

    #[test]
    fn java_string_identity() {
        let code = "class A { boolean f(String s) { return s == \"admin\"; } }";
        let found = hits(code, Language::Java, "string-reference-equality");
        assert_eq!(found.len(), 1);
        assert!(found[0].values["fix"].contains("equals"));

        let code = "class A { boolean f(String s) { return s == null; } }";
        assert!(hits(code, Language::Java, "string-reference-equality").is_empty());
    }

    #[test]
    fn python_is_against_string() {
        let code = "if mode is 'fast':\n    go()\n";
        assert_eq!(hits(code, Language::Python, "string-reference-equality").len(), 1);
        let code = "if mode is None:\n    go()\n";
        assert!(hits(code, Language::Python, "string-reference-equality").is_empty());
    }
}
