// DeepReview Core Library
// 核心功能库，包含语言前端、统一语法树、规则引擎和报告聚合

pub mod ast;
pub mod config;
pub mod logging;
pub mod rules;
pub mod scanner;

// 重新导出常用类型
pub use ast::{detect_language, FrontEndRegistry, Language, NodeKind, ParseError, Span, SyntaxNode};
pub use config::{AnalysisConfig, StyleLimits};
pub use error::{CoreError, Result};
pub use rules::{
    load_rules_from_dir, CustomRuleSpec, FindingClass, Rule, RuleClass, RuleContext, RuleMatch,
    RuleRegistry, Severity,
};
pub use scanner::enhance::{enhance_result, Enhancement, Enhancer, SourceContext};
pub use scanner::manager::{inputs_from_dir, Analyzer, BatchInput, BatchReport, CancellationToken};
pub use scanner::report::{AnalysisResult, QualityMetrics};
pub use scanner::severity::{RefinementSpec, SeverityClassifier};
pub use scanner::Finding;

pub mod error {
    use thiserror::Error;

    use crate::ast::ParseError;

    #[derive(Error, Debug)]
    pub enum CoreError {
        #[error("Unsupported language: {0}")]
        UnsupportedLanguage(String),

        #[error("Parse error: {0}")]
        Parse(#[from] ParseError),

        #[error("Rule `{rule_id}` failed: {message}")]
        RuleEvaluation { rule_id: String, message: String },

        #[error("Analysis exceeded {limit_ms} ms")]
        Timeout { limit_ms: u64 },

        #[error("Invalid configuration: {0}")]
        ConfigurationInvalid(String),

        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
    }

    pub type Result<T> = std::result::Result<T, CoreError>;

    impl CoreError {
        pub fn config(message: impl Into<String>) -> Self {
            CoreError::ConfigurationInvalid(message.into())
        }

        /// Rule id of the synthetic finding that reports this error.
        pub fn diagnostic_id(&self) -> &'static str {
            match self {
                CoreError::UnsupportedLanguage(_) => "unsupported-language",
                CoreError::Parse(_) => "parse-failure",
                CoreError::RuleEvaluation { .. } => "rule-evaluation-failure",
                CoreError::Timeout { .. } => "timeout-exceeded",
                CoreError::ConfigurationInvalid(_) => "invalid-configuration",
                CoreError::Io(_) => "io-failure",
            }
        }
    }
}
