use serde::{Deserialize, Serialize};

/// Source range of a node. Lines and columns are 1-based; columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    #[serde(skip)]
    pub start_byte: usize,
    #[serde(skip)]
    pub end_byte: usize,
}

impl Span {
    pub fn from_node(node: &tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_line: start.row + 1,
            start_column: start.column + 1,
            end_line: end.row + 1,
            end_column: end.column + 1,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }

    /// Span covering all of `content`.
    pub fn whole(content: &str) -> Self {
        let end_line = content.matches('\n').count() + 1;
        let last_line_len = content.rsplit('\n').next().map_or(0, str::len);
        Self {
            start_line: 1,
            start_column: 1,
            end_line,
            end_column: last_line_len + 1,
            start_byte: 0,
            end_byte: content.len(),
        }
    }

    /// Smallest span covering `self` and `other`.
    pub fn merge(&self, other: &Span) -> Span {
        let (start, end) = (self.min(other), self.max_end(other));
        Span {
            start_line: start.start_line,
            start_column: start.start_column,
            start_byte: start.start_byte,
            end_line: end.end_line,
            end_column: end.end_column,
            end_byte: end.end_byte,
        }
    }

    fn min<'a>(&'a self, other: &'a Span) -> &'a Span {
        if self.start_byte <= other.start_byte {
            self
        } else {
            other
        }
    }

    fn max_end<'a>(&'a self, other: &'a Span) -> &'a Span {
        if self.end_byte >= other.end_byte {
            self
        } else {
            other
        }
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }

    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// The node shapes rules can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Loop,
    Conditional,
    Call,
    Return,
    Assignment,
    Declaration,
    Literal,
    Block,
    Other,
}

impl NodeKind {
    pub const ALL: [NodeKind; 9] = [
        NodeKind::Loop,
        NodeKind::Conditional,
        NodeKind::Call,
        NodeKind::Return,
        NodeKind::Assignment,
        NodeKind::Declaration,
        NodeKind::Literal,
        NodeKind::Block,
        NodeKind::Other,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopFlavor {
    While,
    DoWhile,
    For,
    ForEach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    Return,
    Throw,
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralKind {
    Str,
    Template { interpolated: bool },
    Number,
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_name: Option<String>,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Function { params: Vec<Param> },
    Class,
    Variable { value: Option<usize>, type_name: Option<String> },
}

/// Kind-specific payload. Child references are indices into `SyntaxNode::children`.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Loop {
        flavor: LoopFlavor,
        condition: Option<usize>,
    },
    Conditional {
        condition: Option<usize>,
        has_alternative: bool,
    },
    Call {
        callee: String,
        name: String,
        receiver: Option<String>,
        constructor: bool,
        arguments: Option<usize>,
    },
    Return(Jump),
    Assignment {
        target: String,
        operator: String,
        value: Option<usize>,
    },
    Declaration {
        name: Option<String>,
        decl: DeclKind,
    },
    Literal {
        kind: LiteralKind,
        value: String,
    },
    Block,
    Other(OtherShape),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OtherShape {
    Identifier(String),
    Member { object: String, property: String, optional: bool },
    Index { object: String },
    Binary { operator: String },
    Trivia,
    Generic,
}

/// One node of the unified tree. Children are owned by their parent.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub data: NodeData,
    pub span: Span,
    pub native_kind: &'static str,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Loop { .. } => NodeKind::Loop,
            NodeData::Conditional { .. } => NodeKind::Conditional,
            NodeData::Call { .. } => NodeKind::Call,
            NodeData::Return(_) => NodeKind::Return,
            NodeData::Assignment { .. } => NodeKind::Assignment,
            NodeData::Declaration { .. } => NodeKind::Declaration,
            NodeData::Literal { .. } => NodeKind::Literal,
            NodeData::Block => NodeKind::Block,
            NodeData::Other(_) => NodeKind::Other,
        }
    }

    pub fn child(&self, index: Option<usize>) -> Option<&SyntaxNode> {
        index.and_then(|i| self.children.get(i))
    }

    /// Loop or conditional condition.
    pub fn condition(&self) -> Option<&SyntaxNode> {
        match self.data {
            NodeData::Loop { condition, .. } | NodeData::Conditional { condition, .. } => {
                self.child(condition)
            }
            _ => None,
        }
    }

    /// Assigned value, variable initializer, or call arguments.
    pub fn value(&self) -> Option<&SyntaxNode> {
        match &self.data {
            NodeData::Assignment { value, .. } => self.child(*value),
            NodeData::Declaration {
                decl: DeclKind::Variable { value, .. },
                ..
            } => self.child(*value),
            NodeData::Call { arguments, .. } => self.child(*arguments),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(
            self.data,
            NodeData::Declaration {
                decl: DeclKind::Function { .. },
                ..
            }
        )
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self.data, NodeData::Other(OtherShape::Trivia))
    }

    pub fn declared_name(&self) -> Option<&str> {
        match &self.data {
            NodeData::Declaration { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match &self.data {
            NodeData::Other(OtherShape::Identifier(name)) => Some(name),
            _ => None,
        }
    }

    pub fn binary_operator(&self) -> Option<&str> {
        match &self.data {
            NodeData::Other(OtherShape::Binary { operator }) => Some(operator),
            _ => None,
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        match &self.data {
            NodeData::Literal {
                kind: LiteralKind::Str | LiteralKind::Template { .. },
                value,
            } => Some(value),
            _ => None,
        }
    }

    pub fn jump(&self) -> Option<Jump> {
        match self.data {
            NodeData::Return(jump) => Some(jump),
            _ => None,
        }
    }

    /// Non-trivia children.
    pub fn statements(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter(|c| !c.is_trivia())
    }

    /// Pre-order iterator over this node and its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self],
            stop_at_functions: false,
        }
    }

    /// Pre-order descendants that do not enter nested function bodies.
    pub fn descendants_in_scope(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
            stop_at_functions: true,
        }
    }

    pub fn count(&self) -> usize {
        self.descendants().count()
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a SyntaxNode>,
    stop_at_functions: bool,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if !(self.stop_at_functions && node.is_function()) {
            self.stack.extend(node.children.iter().rev());
        }
        Some(node)
    }
}
