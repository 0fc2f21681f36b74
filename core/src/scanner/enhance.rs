// Enhancement hook - 可选的后处理阶段（如 LLM 改写说明），不影响检测结果

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ast::Language;
use crate::scanner::report::AnalysisResult;
use crate::scanner::Finding;

const CONTEXT_RADIUS: usize = 3;

/// Source lines around a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContext {
    pub file_path: String,
    pub language: Option<Language>,
    /// 1-based line number of `lines[0]`.
    pub first_line: usize,
    pub lines: Vec<String>,
}

impl SourceContext {
    pub fn around(source: &str, file_path: &str, language: Option<Language>, finding: &Finding) -> Self {
        let first_line = finding.span.start_line.saturating_sub(CONTEXT_RADIUS).max(1);
        let last_line = finding.span.end_line.max(finding.span.start_line) + CONTEXT_RADIUS;
        let lines = source
            .lines()
            .enumerate()
            .filter(|(i, _)| (first_line..=last_line).contains(&(i + 1)))
            .map(|(_, line)| line.to_string())
            .collect();
        Self {
            file_path: file_path.to_string(),
            language,
            first_line,
            lines,
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Replacement text returned by an enhancer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enhancement {
    pub message: Option<String>,
    pub suggestion: Option<String>,
}

/// 增强器 trait - 外部协作者实现，例如调用 LLM 服务
#[async_trait]
pub trait Enhancer: Send + Sync {
    /// 返回增强器名称
    fn name(&self) -> String;

    /// `None` keeps the finding as it is.
    async fn enhance(&self, finding: &Finding, context: &SourceContext) -> Option<Enhancement>;
}

/// Applies `enhancer` to every rule finding of `result`, each call bounded by `limit`.
/// Diagnostics, timeouts and empty answers leave findings unchanged.
pub async fn enhance_result(
    mut result: AnalysisResult,
    source: &str,
    enhancer: &dyn Enhancer,
    limit: Duration,
) -> AnalysisResult {
    let mut enhanced = Vec::with_capacity(result.findings.len());
    for finding in &result.findings {
        if finding.is_diagnostic() {
            enhanced.push(finding.clone());
            continue;
        }
        let context = SourceContext::around(source, &result.file_path, result.language, finding);
        match tokio::time::timeout(limit, enhancer.enhance(finding, &context)).await {
            Ok(Some(e)) => enhanced.push(finding.with_text(e.message, e.suggestion)),
            Ok(None) => enhanced.push(finding.clone()),
            Err(_) => {
                tracing::warn!(
                    "enhancer {} timed out after {:?} on {}",
                    enhancer.name(),
                    limit,
                    finding.rule_id
                );
                enhanced.push(finding.clone());
            }
        }
    }
    result.findings = enhanced;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_clamped_to_the_file() {
        let source = (1..=10).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let finding = Finding::diagnostic("a.py", "x", 2, 1, "m".to_string());
        let ctx = SourceContext::around(&source, "a.py", Some(Language::Python), &finding);
        assert_eq!(ctx.first_line, 1);
        assert_eq!(ctx.lines.first().map(String::as_str), Some("line 1"));
        assert_eq!(ctx.lines.last().map(String::as_str), Some("line 5"));

        let finding = Finding::diagnostic("a.py", "x", 9, 1, "m".to_string());
        let ctx = SourceContext::around(&source, "a.py", None, &finding);
        assert_eq!(ctx.first_line, 6);
        assert_eq!(ctx.lines.len(), 5);
    }
}
