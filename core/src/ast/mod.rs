pub mod adapter;
pub mod language;
pub mod node;
pub mod parser;
pub mod tables;

pub use adapter::{MappingTable, Shape};
pub use language::{detect_language, Language};
pub use node::{DeclKind, Jump, LiteralKind, LoopFlavor, NodeData, NodeKind, OtherShape, Param, Span, SyntaxNode};
pub use parser::{FrontEnd, FrontEndRegistry, ParseError, SyntaxTree};
