// Adapter layer - 把各语言的 tree-sitter 原生树转换为统一的 SyntaxNode 视图
//
// Only this module knows native node shapes. Unmapped native types become
// `Other(Generic)` and their children are still converted.

use std::collections::HashMap;
use tree_sitter::Node;

use crate::ast::node::{
    DeclKind, Jump, LiteralKind, LoopFlavor, NodeData, OtherShape, Param, Span, SyntaxNode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralShape {
    Str,
    Template,
    Number,
    True,
    False,
    Null,
}

/// What a native node type maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Loop(LoopFlavor),
    Conditional,
    Call { constructor: bool },
    Jump(Jump),
    Assignment,
    Function,
    Class,
    Variable,
    Literal(LiteralShape),
    Block,
    Identifier,
    Member,
    Index,
    Binary,
    Trivia,
    /// Collapsed into its only named child.
    Transparent,
}

/// Native node type to shape lookup, built from one or more static tables.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    shapes: HashMap<&'static str, Shape>,
}

impl MappingTable {
    pub fn new(tables: &[&'static [(&'static str, Shape)]]) -> Self {
        let mut shapes = HashMap::new();
        for table in tables {
            for (kind, shape) in table.iter() {
                shapes.insert(*kind, *shape);
            }
        }
        Self { shapes }
    }

    pub fn shape(&self, native_kind: &str) -> Option<Shape> {
        self.shapes.get(native_kind).copied()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// A native node whose children are still being converted.
struct Frame<'t> {
    node: Node<'t>,
    shape: Option<Shape>,
    ids: Vec<usize>,
    children: Vec<SyntaxNode>,
    pending: std::vec::IntoIter<Node<'t>>,
}

pub struct Adapter<'a> {
    source: &'a str,
    table: &'a MappingTable,
}

impl<'a> Adapter<'a> {
    pub fn new(source: &'a str, table: &'a MappingTable) -> Self {
        Self { source, table }
    }

    /// Converts the native root. The root span always covers the whole file.
    pub fn convert_root(&self, root: Node) -> SyntaxNode {
        let mut node = self.convert(root);
        node.span = Span::whole(self.source);
        node
    }

    /// Builds the unified tree bottom-up with an explicit stack, so nesting depth is
    /// bounded by the heap rather than the thread stack.
    fn convert(&self, root: Node<'_>) -> SyntaxNode {
        let mut stack = vec![self.enter(root)];
        while let Some(mut frame) = stack.pop() {
            if let Some(child) = frame.pending.next() {
                stack.push(frame);
                stack.push(self.enter(child));
                continue;
            }
            let node = self.finish(frame);
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => return node,
            }
        }
        // the root frame always returns above
        SyntaxNode {
            data: NodeData::Other(OtherShape::Generic),
            span: Span::from_node(&root),
            native_kind: root.kind(),
            children: Vec::new(),
        }
    }

    fn enter<'t>(&self, mut node: Node<'t>) -> Frame<'t> {
        let mut shape = self.table.shape(node.kind());
        while shape == Some(Shape::Transparent) && node.named_child_count() == 1 {
            let Some(only) = node.named_child(0) else {
                break;
            };
            node = only;
            shape = self.table.shape(node.kind());
        }

        let mut cursor = node.walk();
        let natives: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
        Frame {
            node,
            shape,
            ids: natives.iter().map(|c| c.id()).collect(),
            children: Vec::with_capacity(natives.len()),
            pending: natives.into_iter(),
        }
    }

    fn finish(&self, frame: Frame<'_>) -> SyntaxNode {
        let data = match frame.shape {
            Some(shape) => self.build(shape, frame.node, &frame.ids),
            None => NodeData::Other(OtherShape::Generic),
        };
        SyntaxNode {
            data,
            span: Span::from_node(&frame.node),
            native_kind: frame.node.kind(),
            children: frame.children,
        }
    }

    fn build(&self, shape: Shape, node: Node, ids: &[usize]) -> NodeData {
        let index_of = |field: &str| -> Option<usize> {
            let target = node.child_by_field_name(field)?;
            ids.iter().position(|id| *id == target.id())
        };

        match shape {
            Shape::Loop(flavor) => {
                let condition = match flavor {
                    LoopFlavor::ForEach => None,
                    _ => node
                        .child_by_field_name("condition")
                        .filter(|c| c.kind() != "empty_statement" && c.kind() != ";")
                        .and_then(|c| ids.iter().position(|id| *id == c.id())),
                };
                NodeData::Loop { flavor, condition }
            }
            Shape::Conditional => {
                let condition = index_of("condition").or_else(|| {
                    // python `a if cond else b` carries no field names
                    (node.kind() == "conditional_expression" && ids.len() >= 2).then_some(1)
                });
                let has_alternative = node.child_by_field_name("alternative").is_some()
                    || matches!(node.kind(), "conditional_expression" | "ternary_expression");
                NodeData::Conditional {
                    condition,
                    has_alternative,
                }
            }
            Shape::Call { constructor } => self.build_call(node, constructor, ids),
            Shape::Jump(jump) => NodeData::Return(jump),
            Shape::Assignment => NodeData::Assignment {
                target: self.field_text(node, "left").unwrap_or_default(),
                operator: self
                    .field_text(node, "operator")
                    .unwrap_or_else(|| "=".to_string()),
                value: index_of("right"),
            },
            Shape::Function => NodeData::Declaration {
                name: self
                    .field_text(node, "name")
                    .or_else(|| self.binding_name(node)),
                decl: DeclKind::Function {
                    params: node
                        .child_by_field_name("parameters")
                        .or_else(|| node.child_by_field_name("parameter"))
                        .map(|p| self.params(p))
                        .unwrap_or_default(),
                },
            },
            Shape::Class => NodeData::Declaration {
                name: self.field_text(node, "name"),
                decl: DeclKind::Class,
            },
            Shape::Variable => {
                let type_name = node
                    .child_by_field_name("type")
                    .or_else(|| node.parent().and_then(|p| p.child_by_field_name("type")))
                    .map(|t| clean_type(self.text(t)));
                NodeData::Declaration {
                    name: self.field_text(node, "name"),
                    decl: DeclKind::Variable {
                        value: index_of("value"),
                        type_name,
                    },
                }
            }
            Shape::Literal(literal) => self.build_literal(node, literal),
            Shape::Block => NodeData::Block,
            Shape::Identifier => NodeData::Other(OtherShape::Identifier(self.text(node).to_string())),
            Shape::Member => {
                let object = node
                    .child_by_field_name("object")
                    .or_else(|| node.child_by_field_name("value"));
                let property = node
                    .child_by_field_name("property")
                    .or_else(|| node.child_by_field_name("attribute"))
                    .or_else(|| node.child_by_field_name("field"));
                let optional = object
                    .and_then(|o| self.source.get(o.end_byte()..node.end_byte()))
                    .is_some_and(|rest| rest.trim_start().starts_with("?."));
                NodeData::Other(OtherShape::Member {
                    object: object.map(|o| self.text(o).to_string()).unwrap_or_default(),
                    property: property.map(|p| self.text(p).to_string()).unwrap_or_default(),
                    optional,
                })
            }
            Shape::Index => {
                let object = node
                    .child_by_field_name("value")
                    .or_else(|| node.child_by_field_name("object"))
                    .or_else(|| node.child_by_field_name("array"));
                NodeData::Other(OtherShape::Index {
                    object: object.map(|o| self.text(o).to_string()).unwrap_or_default(),
                })
            }
            Shape::Binary => NodeData::Other(OtherShape::Binary {
                operator: self
                    .field_text(node, "operator")
                    .unwrap_or_else(|| self.anonymous_operator(node)),
            }),
            Shape::Trivia => NodeData::Other(OtherShape::Trivia),
            Shape::Transparent => NodeData::Other(OtherShape::Generic),
        }
    }

    fn build_call(&self, node: Node, constructor: bool, ids: &[usize]) -> NodeData {
        let arguments = node
            .child_by_field_name("arguments")
            .and_then(|a| ids.iter().position(|id| *id == a.id()));

        // java `recv.name(args)`
        if let Some(name_node) = node.child_by_field_name("name") {
            let name = self.text(name_node).to_string();
            let receiver = self.field_text(node, "object");
            let callee = match &receiver {
                Some(r) => format!("{}.{}", r, name),
                None => name.clone(),
            };
            return NodeData::Call {
                callee,
                name,
                receiver,
                constructor,
                arguments,
            };
        }

        let target = node
            .child_by_field_name("function")
            .or_else(|| node.child_by_field_name("constructor"))
            .or_else(|| node.child_by_field_name("type"));
        let callee = target
            .map(|t| squash(self.text(t)))
            .unwrap_or_default();
        let receiver = target
            .filter(|t| matches!(t.kind(), "attribute" | "member_expression" | "field_access"))
            .and_then(|t| t.child_by_field_name("object"))
            .map(|o| self.text(o).to_string());
        let name = callee
            .rsplit(|c| c == '.' || c == '?')
            .next()
            .unwrap_or_default()
            .to_string();

        NodeData::Call {
            callee,
            name,
            receiver,
            constructor,
            arguments,
        }
    }

    fn build_literal(&self, node: Node, literal: LiteralShape) -> NodeData {
        let text = self.text(node);
        let interpolated = {
            let mut cursor = node.walk();
            let found = node
                .named_children(&mut cursor)
                .any(|c| matches!(c.kind(), "interpolation" | "template_substitution"));
            found
        };
        let kind = match literal {
            LiteralShape::Str if interpolated => LiteralKind::Template { interpolated: true },
            LiteralShape::Str => LiteralKind::Str,
            LiteralShape::Template => LiteralKind::Template { interpolated },
            LiteralShape::Number => LiteralKind::Number,
            LiteralShape::True => LiteralKind::Bool(true),
            LiteralShape::False => LiteralKind::Bool(false),
            LiteralShape::Null => LiteralKind::Null,
        };
        let value = match kind {
            LiteralKind::Str | LiteralKind::Template { .. } => unquote(text),
            _ => text.to_string(),
        };
        NodeData::Literal { kind, value }
    }

    fn params(&self, params: Node) -> Vec<Param> {
        // single-parameter arrow functions: `x => x.y`
        if params.kind() == "identifier" {
            return vec![Param {
                name: self.text(params).to_string(),
                type_name: None,
                nullable: false,
            }];
        }

        let mut out = Vec::new();
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            if param.kind().contains("comment") {
                continue;
            }
            let name_node = if param.kind() == "identifier" {
                Some(param)
            } else {
                param
                    .child_by_field_name("name")
                    .or_else(|| param.child_by_field_name("pattern"))
                    .or_else(|| param.child_by_field_name("left"))
                    .or_else(|| {
                        let mut inner = param.walk();
                        let found = param
                            .named_children(&mut inner)
                            .find(|c| c.kind() == "identifier");
                        found
                    })
            };
            let Some(name_node) = name_node else {
                continue;
            };
            let type_name = param
                .child_by_field_name("type")
                .map(|t| clean_type(self.text(t)));
            let default = param
                .child_by_field_name("value")
                .or_else(|| param.child_by_field_name("right"))
                .map(|d| self.text(d));
            let nullable = matches!(default, Some("None" | "null" | "undefined"))
                || type_name.as_deref().is_some_and(nullable_type)
                || param.kind() == "optional_parameter"
                || self.text(param).contains("@Nullable");
            out.push(Param {
                name: self.text(name_node).trim_start_matches('*').to_string(),
                type_name,
                nullable,
            });
        }
        out
    }

    /// Name of the binding an anonymous function is assigned to.
    fn binding_name(&self, node: Node) -> Option<String> {
        let parent = node.parent()?;
        let field = match parent.kind() {
            "variable_declarator" | "public_field_definition" | "field_definition" => "name",
            "assignment_expression" | "assignment" => "left",
            "pair" => "key",
            _ => return None,
        };
        self.field_text(parent, field)
    }

    fn anonymous_operator(&self, node: Node) -> String {
        let mut parts = Vec::new();
        let mut seen_named = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.is_named() {
                if seen_named && !parts.is_empty() {
                    break;
                }
                seen_named = true;
            } else if seen_named {
                parts.push(self.text(child));
            }
        }
        parts.join(" ")
    }

    fn field_text(&self, node: Node, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|n| self.text(n).to_string())
    }

    fn text(&self, node: Node) -> &'a str {
        self.source.get(node.byte_range()).unwrap_or("")
    }
}

fn unquote(text: &str) -> String {
    let body = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'", "`"] {
        if body.len() >= quote.len() * 2 && body.starts_with(quote) && body.ends_with(quote) {
            return body[quote.len()..body.len() - quote.len()].to_string();
        }
    }
    body.to_string()
}

fn clean_type(text: &str) -> String {
    text.trim_start_matches(':').trim().to_string()
}

fn nullable_type(type_name: &str) -> bool {
    type_name.starts_with("Optional")
        || type_name.contains("None")
        || type_name.contains("null")
        || type_name.contains("undefined")
}

fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_handles_prefixes_and_triple_quotes() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("f'{x} y'"), "{x} y");
        assert_eq!(unquote("\"\"\"doc\"\"\""), "doc");
        assert_eq!(unquote("`tpl ${a}`"), "tpl ${a}");
        assert_eq!(unquote("rb'raw'"), "raw");
    }

    #[test]
    fn table_lookup_merges_layers() {
        let table = MappingTable::new(&[
            crate::ast::tables::javascript::TABLE,
            crate::ast::tables::javascript::TYPESCRIPT_EXTRA,
        ]);
        assert_eq!(table.shape("interface_declaration"), Some(Shape::Class));
        assert_eq!(table.shape("call_expression"), Some(Shape::Call { constructor: false }));
        assert_eq!(table.shape("jsx_element"), None);
    }
}
