// Scanner module - 扫描器模块
// 规则引擎遍历、严重性分级、结果聚合与分析入口

pub mod engine;
pub mod enhance;
pub mod manager;
pub mod report;
pub mod severity;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::ast::{Language, Span, SyntaxTree};
use crate::rules::{render, FindingClass, Rule, RuleMatch, Severity};

const SNIPPET_LIMIT: usize = 300;

/// One submitted file together with its parsed tree.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub filename: String,
    pub content: String,
    pub language: Language,
    pub tree: SyntaxTree,
}

impl SourceUnit {
    pub fn new(filename: impl Into<String>, content: impl Into<String>, language: Language, tree: SyntaxTree) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            language,
            tree,
        }
    }

    pub fn text(&self, span: &Span) -> &str {
        self.content.get(span.start_byte..span.end_byte).unwrap_or("")
    }
}

/// 漏洞发现结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub finding_id: String,
    pub file_path: String,
    pub rule_id: String,
    pub class: FindingClass,
    pub severity: Severity,
    pub span: Span,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwe: Option<String>,
}

impl Finding {
    /// Renders a rule hit. `span` falls back to `node_span` when the hit carries none.
    pub fn from_match(unit: &SourceUnit, rule: &Rule, hit: &RuleMatch, node_span: Span, severity: Severity) -> Self {
        let span = hit.span.unwrap_or(node_span);
        let snippet = truncate(unit.text(&span));
        Finding {
            finding_id: finding_id(&unit.filename, &rule.id, &span),
            file_path: unit.filename.clone(),
            rule_id: rule.id.clone(),
            class: rule.class.into(),
            severity,
            span,
            message: render(&rule.message, &hit.values),
            code_snippet: (!snippet.is_empty()).then_some(snippet),
            suggestion: rule.suggestion.as_ref().map(|s| render(s, &hit.values)),
            explanation: render(&rule.explanation, &hit.values),
            cwe: rule.cwe.clone(),
        }
    }

    /// Synthetic finding describing a failure to analyze the file.
    pub fn diagnostic(file_path: &str, rule_id: &str, line: usize, column: usize, message: String) -> Self {
        let span = Span {
            start_line: line,
            start_column: column,
            end_line: line,
            end_column: column,
            start_byte: 0,
            end_byte: 0,
        };
        Finding {
            finding_id: finding_id(file_path, rule_id, &span),
            file_path: file_path.to_string(),
            rule_id: rule_id.to_string(),
            class: FindingClass::Diagnostic,
            severity: Severity::High,
            span,
            explanation: format!("The file could not be analyzed: {}", message),
            message,
            code_snippet: None,
            suggestion: None,
            cwe: None,
        }
    }

    pub fn line(&self) -> usize {
        self.span.start_line
    }

    pub fn column(&self) -> usize {
        self.span.start_column
    }

    pub fn is_diagnostic(&self) -> bool {
        self.class == FindingClass::Diagnostic
    }

    /// Copy with a replacement message and/or suggestion. Identity, severity and location are kept.
    pub fn with_text(&self, message: Option<String>, suggestion: Option<String>) -> Finding {
        let mut finding = self.clone();
        if let Some(message) = message {
            finding.message = message;
        }
        if suggestion.is_some() {
            finding.suggestion = suggestion;
        }
        finding
    }
}

fn finding_id(file: &str, rule_id: &str, span: &Span) -> String {
    let mut hasher = Sha1::new();
    hasher.update(file.as_bytes());
    hasher.update(b"\0");
    hasher.update(rule_id.as_bytes());
    hasher.update(
        format!(
            "\0{}:{}-{}:{}",
            span.start_line, span.start_column, span.end_line, span.end_column
        )
        .as_bytes(),
    );
    format!("{:x}", hasher.finalize())
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
