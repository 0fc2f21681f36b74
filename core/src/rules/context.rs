use crate::ast::{Language, NodeData, NodeKind, Span, SyntaxNode};

/// Read-only view handed to a rule predicate: the node, its ancestor chain
/// (root first, parent last) and the file it came from.
pub struct RuleContext<'a> {
    pub node: &'a SyntaxNode,
    pub ancestors: &'a [&'a SyntaxNode],
    pub language: Language,
    pub source: &'a str,
    pub filename: &'a str,
}

impl<'a> RuleContext<'a> {
    pub fn parent(&self) -> Option<&'a SyntaxNode> {
        self.ancestors.last().copied()
    }

    /// Nearest enclosing function, if any.
    pub fn enclosing_function(&self) -> Option<&'a SyntaxNode> {
        self.ancestors.iter().rev().find(|n| n.is_function()).copied()
    }

    /// Nearest loop inside the current function boundary.
    pub fn enclosing_loop(&self) -> Option<&'a SyntaxNode> {
        self.ancestors
            .iter()
            .rev()
            .take_while(|n| !n.is_function())
            .find(|n| n.kind() == NodeKind::Loop)
            .copied()
    }

    /// Enclosing function, or the file root at top level.
    pub fn scope(&self) -> &'a SyntaxNode {
        self.enclosing_function()
            .or_else(|| self.ancestors.first().copied())
            .unwrap_or(self.node)
    }

    /// Ancestors between the enclosing function (exclusive) and the node.
    pub fn ancestors_in_function(&self) -> &'a [&'a SyntaxNode] {
        match self.ancestors.iter().rposition(|n| n.is_function()) {
            Some(i) => &self.ancestors[i + 1..],
            None => self.ancestors,
        }
    }

    /// Names of enclosing functions and classes, outermost first.
    pub fn enclosing_names(&self) -> Vec<&'a str> {
        self.ancestors
            .iter()
            .filter_map(|n| n.declared_name())
            .collect()
    }

    pub fn text(&self, span: &Span) -> &'a str {
        self.source.get(span.start_byte..span.end_byte).unwrap_or("")
    }

    pub fn node_text(&self, node: &SyntaxNode) -> &'a str {
        self.text(&node.span)
    }

    /// Latest assignment or declaration of `name` in the current scope that ends
    /// before `before`, with its value node.
    pub fn last_binding(
        &self,
        name: &str,
        before: usize,
    ) -> Option<(&'a SyntaxNode, Option<&'a SyntaxNode>)> {
        let scope = self.scope();
        scope
            .descendants_in_scope()
            .filter(|n| n.span.end_byte <= before)
            .filter(|n| binding_name(n) == Some(name))
            .last()
            .map(|n| (n, n.value()))
    }
}

/// Name bound by a declaration or plain assignment.
pub fn binding_name(node: &SyntaxNode) -> Option<&str> {
    match &node.data {
        NodeData::Declaration { name, .. } if !node.is_function() => name.as_deref(),
        NodeData::Assignment { target, .. } => Some(target.as_str()),
        _ => None,
    }
}

/// Left and right operands of a binary node.
pub fn operands(node: &SyntaxNode) -> Option<(&SyntaxNode, &SyntaxNode)> {
    let mut parts = node.statements();
    let left = parts.next()?;
    let right = parts.last()?;
    Some((left, right))
}

/// Positional arguments of a call.
pub fn arguments(call: &SyntaxNode) -> Vec<&SyntaxNode> {
    call.value()
        .map(|args| args.statements().collect())
        .unwrap_or_default()
}

/// True when `text` contains `ident` as a whole word.
pub fn mentions(text: &str, ident: &str) -> bool {
    if ident.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    text.match_indices(ident).any(|(i, _)| {
        let before = text[..i].chars().next_back();
        let after = text[i + ident.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

pub fn is_plain_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Splits `fooBarBaz`, `foo_bar`, `FOO-BAR` into lowercase words.
pub fn name_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = name.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let boundary = c.is_uppercase()
            && i > 0
            && (chars[i - 1].is_lowercase()
                || (chars[i - 1].is_uppercase() && chars.get(i + 1).is_some_and(|n| n.is_lowercase())));
        if boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
