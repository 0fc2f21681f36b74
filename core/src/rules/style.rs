// Style rule set - 命名规范、嵌套深度、函数长度

use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{DeclKind, Language, NodeData, NodeKind, SyntaxNode};
use crate::config::StyleLimits;
use crate::rules::context::RuleContext;
use crate::rules::{Rule, RuleClass, RuleMatch, Severity};

pub fn rules(limits: &StyleLimits) -> Vec<Rule> {
    let max_depth = limits.max_nesting_depth;
    let max_lines = limits.max_function_lines;
    vec![
        Rule::new(
            "naming-convention",
            RuleClass::Style,
            Severity::Low,
            &[NodeKind::Declaration],
            naming_convention,
        )
        .named("Naming convention")
        .message("{kind} `{name}` should be {convention}")
        .suggestion("Rename `{name}` to {convention}.")
        .explanation("Consistent naming makes declarations recognisable at a glance."),
        Rule::new(
            "deep-nesting",
            RuleClass::Style,
            Severity::Low,
            &[NodeKind::Loop, NodeKind::Conditional],
            move |ctx| deep_nesting(ctx, max_depth),
        )
        .named("Deep nesting")
        .message("Nesting depth {depth} exceeds the limit of {max}")
        .suggestion("Return early or extract the inner block into a helper function.")
        .explanation("Deeply nested control flow is hard to follow and to test branch by branch."),
        Rule::new(
            "long-function",
            RuleClass::Style,
            Severity::Low,
            &[NodeKind::Declaration],
            move |ctx| long_function(ctx, max_lines),
        )
        .named("Long function")
        .message("`{name}` is {lines} lines long (limit {max})")
        .suggestion("Split `{name}` into smaller functions with one responsibility each.")
        .explanation("Long functions tend to mix concerns and are harder to review."),
    ]
}

struct Conventions {
    snake: Regex,
    camel: Regex,
    pascal: Regex,
}

fn conventions() -> &'static Conventions {
    static CONVENTIONS: OnceLock<Conventions> = OnceLock::new();
    CONVENTIONS.get_or_init(|| Conventions {
        snake: Regex::new(r"^_{0,2}[a-z][a-z0-9_]*$").expect("snake_case pattern"),
        camel: Regex::new(r"^_?[a-z][a-zA-Z0-9]*$").expect("camelCase pattern"),
        pascal: Regex::new(r"^_?[A-Z][A-Za-z0-9]*$").expect("PascalCase pattern"),
    })
}

/// Named function forms; anonymous functions take their binding's name and are skipped.
const NAMED_FUNCTIONS: &[&str] = &[
    "function_definition",
    "function_declaration",
    "generator_function_declaration",
    "method_definition",
    "method_declaration",
];

fn naming_convention(ctx: &RuleContext<'_>) -> Vec<RuleMatch> {
    let NodeData::Declaration {
        name: Some(name),
        decl,
    } = &ctx.node.data
    else {
        return Vec::new();
    };
    let c = conventions();

    let (kind, ok, convention) = match decl {
        DeclKind::Class => ("Class", c.pascal.is_match(name), "PascalCase"),
        DeclKind::Function { .. } if NAMED_FUNCTIONS.contains(&ctx.node.native_kind) => {
            if name == "constructor" {
                return Vec::new();
            }
            match ctx.language {
                Language::Python => ("Function", c.snake.is_match(name), "snake_case"),
                Language::Java => ("Method", c.camel.is_match(name), "camelCase"),
                Language::JavaScript | Language::TypeScript => {
                    let all_caps = !name.chars().any(|ch| ch.is_lowercase());
                    let inner_underscore = name.trim_start_matches('_').contains('_');
                    ("Function", all_caps || !inner_underscore, "camelCase")
                }
            }
        }
        _ => return Vec::new(),
    };
    if ok {
        return Vec::new();
    }
    vec![RuleMatch::here()
        .with("kind", kind)
        .with("name", name.as_str())
        .with("convention", convention)]
}

/// `elif`, and `if` nodes that form the `else if` branch of another conditional.
fn is_else_if(node: &SyntaxNode, parent: Option<&SyntaxNode>) -> bool {
    if node.native_kind == "elif_clause" {
        return true;
    }
    node.kind() == NodeKind::Conditional
        && parent.is_some_and(|p| {
            p.native_kind == "else_clause"
                || (p.kind() == NodeKind::Conditional
                    && p.native_kind == "if_statement"
                    && p.children.last().is_some_and(|last| last.span == node.span)
                    && p.condition().is_some_and(|c| c.span != node.span))
        })
}

fn counts_as_level(node: &SyntaxNode, parent: Option<&SyntaxNode>) -> bool {
    matches!(node.kind(), NodeKind::Loop | NodeKind::Conditional) && !is_else_if(node, parent)
}

fn deep_nesting(ctx: &RuleContext<'_>, max: usize) -> Vec<RuleMatch> {
    if !counts_as_level(ctx.node, ctx.parent()) {
        return Vec::new();
    }
    let chain = ctx.ancestors_in_function();
    let offset = ctx.ancestors.len() - chain.len();
    let outer = chain
        .iter()
        .enumerate()
        .filter(|(i, n)| {
            let parent = (offset + i)
                .checked_sub(1)
                .and_then(|p| ctx.ancestors.get(p).copied());
            counts_as_level(n, parent)
        })
        .count();
    let depth = outer + 1;
    if depth != max + 1 {
        return Vec::new();
    }
    vec![RuleMatch::here()
        .with("depth", depth.to_string())
        .with("max", max.to_string())]
}

fn long_function(ctx: &RuleContext<'_>, max: usize) -> Vec<RuleMatch> {
    if !ctx.node.is_function() {
        return Vec::new();
    }
    let lines = ctx.node.span.line_count();
    if lines <= max {
        return Vec::new();
    }
    let name = ctx.node.declared_name().unwrap_or("<anonymous>");
    vec![RuleMatch::here()
        .with("name", name)
        .with("lines", lines.to_string())
        .with("max", max.to_string())]
}
