use crate::ast::adapter::{LiteralShape, Shape};
use crate::ast::node::{Jump, LoopFlavor};

pub const TABLE: &[(&str, Shape)] = &[
    ("program", Shape::Block),
    ("block", Shape::Block),
    ("constructor_body", Shape::Block),
    ("switch_block_statement_group", Shape::Block),
    ("while_statement", Shape::Loop(LoopFlavor::While)),
    ("do_statement", Shape::Loop(LoopFlavor::DoWhile)),
    ("for_statement", Shape::Loop(LoopFlavor::For)),
    ("enhanced_for_statement", Shape::Loop(LoopFlavor::ForEach)),
    ("if_statement", Shape::Conditional),
    ("ternary_expression", Shape::Conditional),
    ("method_invocation", Shape::Call { constructor: false }),
    ("object_creation_expression", Shape::Call { constructor: true }),
    ("return_statement", Shape::Jump(Jump::Return)),
    ("throw_statement", Shape::Jump(Jump::Throw)),
    ("break_statement", Shape::Jump(Jump::Break)),
    ("continue_statement", Shape::Jump(Jump::Continue)),
    ("assignment_expression", Shape::Assignment),
    ("method_declaration", Shape::Function),
    ("constructor_declaration", Shape::Function),
    ("lambda_expression", Shape::Function),
    ("class_declaration", Shape::Class),
    ("interface_declaration", Shape::Class),
    ("enum_declaration", Shape::Class),
    ("record_declaration", Shape::Class),
    ("variable_declarator", Shape::Variable),
    ("string_literal", Shape::Literal(LiteralShape::Str)),
    ("character_literal", Shape::Literal(LiteralShape::Str)),
    ("decimal_integer_literal", Shape::Literal(LiteralShape::Number)),
    ("hex_integer_literal", Shape::Literal(LiteralShape::Number)),
    ("decimal_floating_point_literal", Shape::Literal(LiteralShape::Number)),
    ("true", Shape::Literal(LiteralShape::True)),
    ("false", Shape::Literal(LiteralShape::False)),
    ("null_literal", Shape::Literal(LiteralShape::Null)),
    ("identifier", Shape::Identifier),
    ("field_access", Shape::Member),
    ("array_access", Shape::Index),
    ("binary_expression", Shape::Binary),
    ("line_comment", Shape::Trivia),
    ("block_comment", Shape::Trivia),
    ("parenthesized_expression", Shape::Transparent),
    ("expression_statement", Shape::Transparent),
];
