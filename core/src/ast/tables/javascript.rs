use crate::ast::adapter::{LiteralShape, Shape};
use crate::ast::node::{Jump, LoopFlavor};

pub const TABLE: &[(&str, Shape)] = &[
    ("program", Shape::Block),
    ("statement_block", Shape::Block),
    ("switch_case", Shape::Block),
    ("switch_default", Shape::Block),
    ("while_statement", Shape::Loop(LoopFlavor::While)),
    ("do_statement", Shape::Loop(LoopFlavor::DoWhile)),
    ("for_statement", Shape::Loop(LoopFlavor::For)),
    ("for_in_statement", Shape::Loop(LoopFlavor::ForEach)),
    ("if_statement", Shape::Conditional),
    ("ternary_expression", Shape::Conditional),
    ("call_expression", Shape::Call { constructor: false }),
    ("new_expression", Shape::Call { constructor: true }),
    ("return_statement", Shape::Jump(Jump::Return)),
    ("throw_statement", Shape::Jump(Jump::Throw)),
    ("break_statement", Shape::Jump(Jump::Break)),
    ("continue_statement", Shape::Jump(Jump::Continue)),
    ("assignment_expression", Shape::Assignment),
    ("augmented_assignment_expression", Shape::Assignment),
    ("function_declaration", Shape::Function),
    ("function_expression", Shape::Function),
    ("function", Shape::Function),
    ("arrow_function", Shape::Function),
    ("method_definition", Shape::Function),
    ("generator_function_declaration", Shape::Function),
    ("generator_function", Shape::Function),
    ("class_declaration", Shape::Class),
    ("class", Shape::Class),
    ("variable_declarator", Shape::Variable),
    ("string", Shape::Literal(LiteralShape::Str)),
    ("template_string", Shape::Literal(LiteralShape::Template)),
    ("number", Shape::Literal(LiteralShape::Number)),
    ("true", Shape::Literal(LiteralShape::True)),
    ("false", Shape::Literal(LiteralShape::False)),
    ("null", Shape::Literal(LiteralShape::Null)),
    ("undefined", Shape::Literal(LiteralShape::Null)),
    ("identifier", Shape::Identifier),
    ("shorthand_property_identifier", Shape::Identifier),
    ("member_expression", Shape::Member),
    ("subscript_expression", Shape::Index),
    ("binary_expression", Shape::Binary),
    ("comment", Shape::Trivia),
    ("parenthesized_expression", Shape::Transparent),
    ("expression_statement", Shape::Transparent),
];

/// Node types only the TypeScript grammars produce, layered over `TABLE`.
pub const TYPESCRIPT_EXTRA: &[(&str, Shape)] = &[
    ("interface_declaration", Shape::Class),
    ("abstract_class_declaration", Shape::Class),
    ("enum_declaration", Shape::Class),
    ("function_signature", Shape::Function),
];
