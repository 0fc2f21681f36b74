use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use thiserror::Error;
use tree_sitter::{Node, Parser};

use crate::ast::adapter::{Adapter, MappingTable};
use crate::ast::language::Language;
use crate::ast::node::SyntaxNode;
use crate::ast::tables;
use crate::error::{CoreError, Result};

/// Deepest native nesting accepted before a file is rejected as a parse failure.
pub const MAX_NESTING: usize = 1_000;

/// A front-end rejected the content.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// A parsed and adapted file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub language: Language,
    pub root: SyntaxNode,
}

/// One tree-sitter grammar plus its mapping table.
pub struct FrontEnd {
    language: Language,
    grammar: tree_sitter::Language,
    table: MappingTable,
}

impl FrontEnd {
    pub fn new(
        language: Language,
        grammar: tree_sitter::Language,
        tables: &[&'static [(&'static str, crate::ast::adapter::Shape)]],
    ) -> Self {
        Self {
            language,
            grammar,
            table: MappingTable::new(tables),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    fn parse_native(&self, content: &str, timeout: Option<Duration>) -> Result<SyntaxTree> {
        // tree_sitter::Parser is not Sync, so every parse gets its own
        let mut parser = Parser::new();
        parser.set_language(&self.grammar).map_err(|e| ParseError {
            line: 1,
            column: 1,
            message: format!("failed to load {} grammar: {}", self.language, e),
        })?;
        if let Some(limit) = timeout {
            parser.set_timeout_micros(limit.as_micros().max(1) as u64);
        }

        let tree = match parser.parse(content, None) {
            Some(tree) => tree,
            None if timeout.is_some() => {
                return Err(CoreError::Timeout {
                    limit_ms: timeout.map_or(0, |t| t.as_millis() as u64),
                })
            }
            None => {
                return Err(ParseError {
                    line: 1,
                    column: 1,
                    message: "parser returned no tree".to_string(),
                }
                .into())
            }
        };

        let root = tree.root_node();
        if root.has_error() {
            return Err(describe_error(root, content).into());
        }
        if let Some(deep) = beyond_nesting(root, MAX_NESTING) {
            let position = deep.start_position();
            return Err(ParseError {
                line: position.row + 1,
                column: position.column + 1,
                message: format!("nesting exceeds {} levels", MAX_NESTING),
            }
            .into());
        }

        let root = Adapter::new(content, &self.table).convert_root(root);
        Ok(SyntaxTree {
            language: self.language,
            root,
        })
    }
}

/// One front-end per supported language.
pub struct FrontEndRegistry {
    front_ends: HashMap<Language, FrontEnd>,
    tsx: FrontEnd,
}

impl FrontEndRegistry {
    pub fn new() -> Self {
        let mut front_ends = HashMap::new();
        front_ends.insert(
            Language::Python,
            FrontEnd::new(
                Language::Python,
                tree_sitter_python::LANGUAGE.into(),
                &[tables::python::TABLE],
            ),
        );
        front_ends.insert(
            Language::JavaScript,
            FrontEnd::new(
                Language::JavaScript,
                tree_sitter_javascript::LANGUAGE.into(),
                &[tables::javascript::TABLE],
            ),
        );
        front_ends.insert(
            Language::TypeScript,
            FrontEnd::new(
                Language::TypeScript,
                tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
                &[tables::javascript::TABLE, tables::javascript::TYPESCRIPT_EXTRA],
            ),
        );
        front_ends.insert(
            Language::Java,
            FrontEnd::new(
                Language::Java,
                tree_sitter_java::LANGUAGE.into(),
                &[tables::java::TABLE],
            ),
        );
        let tsx = FrontEnd::new(
            Language::TypeScript,
            tree_sitter_typescript::LANGUAGE_TSX.into(),
            &[tables::javascript::TABLE, tables::javascript::TYPESCRIPT_EXTRA],
        );

        tracing::debug!("registered {} front-ends", front_ends.len());
        Self { front_ends, tsx }
    }

    pub fn get(&self, language: Language) -> Option<&FrontEnd> {
        self.front_ends.get(&language)
    }

    pub fn supported_languages(&self) -> Vec<Language> {
        let mut languages: Vec<_> = self.front_ends.keys().copied().collect();
        languages.sort();
        languages
    }

    /// Parses `content` as `language`. Never panics: front-end faults become errors.
    pub fn parse(&self, content: &str, language: Language) -> Result<SyntaxTree> {
        self.parse_file(content, language, "", None)
    }

    /// Like [`parse`](Self::parse) but picks the TSX grammar for `.tsx` files and bounds
    /// the parse by `timeout`.
    pub fn parse_file(
        &self,
        content: &str,
        language: Language,
        filename: &str,
        timeout: Option<Duration>,
    ) -> Result<SyntaxTree> {
        let front_end = if language == Language::TypeScript && filename.to_lowercase().ends_with(".tsx") {
            &self.tsx
        } else {
            self.get(language)
                .ok_or_else(|| CoreError::UnsupportedLanguage(language.to_string()))?
        };

        match panic::catch_unwind(AssertUnwindSafe(|| front_end.parse_native(content, timeout))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!("{} front-end panicked: {}", language, message);
                Err(ParseError {
                    line: 1,
                    column: 1,
                    message: format!("front-end fault: {}", message),
                }
                .into())
            }
        }
    }
}

impl Default for FrontEndRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_error(root: Node, content: &str) -> ParseError {
    let Some(node) = first_error(root) else {
        return ParseError {
            line: 1,
            column: 1,
            message: "syntax error".to_string(),
        };
    };
    let position = node.start_position();
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let text: String = content
            .get(node.byte_range())
            .unwrap_or("")
            .chars()
            .take(24)
            .collect();
        format!("unexpected `{}`", text.trim())
    };
    ParseError {
        line: position.row + 1,
        column: position.column + 1,
        message,
    }
}

/// First ERROR or MISSING node in pre-order, skipping subtrees without errors.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// First node nested deeper than `limit` levels below `root`.
fn beyond_nesting(root: Node<'_>, limit: usize) -> Option<Node<'_>> {
    let mut cursor = root.walk();
    let mut depth = 0usize;
    loop {
        if cursor.goto_first_child() {
            depth += 1;
            if depth > limit {
                return Some(cursor.node());
            }
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
            depth -= 1;
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
