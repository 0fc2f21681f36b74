use crate::ast::adapter::{LiteralShape, Shape};
use crate::ast::node::{Jump, LoopFlavor};

pub const TABLE: &[(&str, Shape)] = &[
    ("module", Shape::Block),
    ("block", Shape::Block),
    ("while_statement", Shape::Loop(LoopFlavor::While)),
    ("for_statement", Shape::Loop(LoopFlavor::ForEach)),
    ("if_statement", Shape::Conditional),
    ("elif_clause", Shape::Conditional),
    ("conditional_expression", Shape::Conditional),
    ("call", Shape::Call { constructor: false }),
    ("return_statement", Shape::Jump(Jump::Return)),
    ("raise_statement", Shape::Jump(Jump::Throw)),
    ("break_statement", Shape::Jump(Jump::Break)),
    ("continue_statement", Shape::Jump(Jump::Continue)),
    ("assignment", Shape::Assignment),
    ("augmented_assignment", Shape::Assignment),
    ("function_definition", Shape::Function),
    ("lambda", Shape::Function),
    ("class_definition", Shape::Class),
    ("string", Shape::Literal(LiteralShape::Str)),
    ("integer", Shape::Literal(LiteralShape::Number)),
    ("float", Shape::Literal(LiteralShape::Number)),
    ("true", Shape::Literal(LiteralShape::True)),
    ("false", Shape::Literal(LiteralShape::False)),
    ("none", Shape::Literal(LiteralShape::Null)),
    ("identifier", Shape::Identifier),
    ("attribute", Shape::Member),
    ("subscript", Shape::Index),
    ("binary_operator", Shape::Binary),
    ("comparison_operator", Shape::Binary),
    ("boolean_operator", Shape::Binary),
    ("comment", Shape::Trivia),
    ("parenthesized_expression", Shape::Transparent),
    ("expression_statement", Shape::Transparent),
];
