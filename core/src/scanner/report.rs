// Report builder - 合并、去重、过滤、排序并计算质量指标

use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ast::{Language, Span};
use crate::rules::{FindingClass, Severity};
use crate::scanner::Finding;

/// Penalty per finding, by severity.
pub fn weight(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 20,
        Severity::High => 10,
        Severity::Medium => 4,
        Severity::Low => 1,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub total_issues: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    /// 0..=100, 100 means no findings.
    pub quality_score: u32,
    pub maintainability_index: f64,
    pub analysis_time_ms: u64,
}

impl QualityMetrics {
    pub fn compute(findings: &[Finding], elapsed: Duration) -> Self {
        let count = |s: Severity| findings.iter().filter(|f| f.severity == s).count();
        let penalty: u32 = findings.iter().map(|f| weight(f.severity)).sum();
        let total = findings.len();
        let maintainability = 100.0 * 50.0 / (50.0 + penalty as f64 + total as f64);
        Self {
            total_issues: total,
            critical_count: count(Severity::Critical),
            high_count: count(Severity::High),
            medium_count: count(Severity::Medium),
            low_count: count(Severity::Low),
            quality_score: 100u32.saturating_sub(penalty),
            maintainability_index: (maintainability * 100.0).round() / 100.0,
            analysis_time_ms: elapsed.as_millis() as u64,
        }
    }
}

/// One file's findings and metrics. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_path: String,
    pub language: Option<Language>,
    pub findings: Vec<Finding>,
    pub metrics: QualityMetrics,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AnalysisResult {
    /// A result carrying a single synthetic failure finding.
    pub fn failure(
        file_path: &str,
        language: Option<Language>,
        finding: Finding,
        error_message: String,
        elapsed: Duration,
    ) -> Self {
        let findings = vec![finding];
        Self {
            file_path: file_path.to_string(),
            language,
            metrics: QualityMetrics::compute(&findings, elapsed),
            findings,
            success: false,
            error_message: Some(error_message),
        }
    }
}

fn class_rank(class: FindingClass) -> u8 {
    match class {
        FindingClass::Bug => 0,
        FindingClass::Security => 1,
        FindingClass::Style => 2,
        FindingClass::Diagnostic => 3,
    }
}

/// Merges per-class findings into the reported list.
#[derive(Debug, Clone, Copy)]
pub struct ReportBuilder {
    threshold: Severity,
}

impl ReportBuilder {
    pub fn new(threshold: Severity) -> Self {
        Self { threshold }
    }

    /// Merge (bug, security, style), drop duplicate (rule id, span) pairs keeping the
    /// first, filter below the threshold, then sort by severity desc, line, column.
    pub fn finalize(&self, mut findings: Vec<Finding>) -> Vec<Finding> {
        findings.sort_by_key(|f| class_rank(f.class));

        let mut seen: HashSet<(String, Span)> = HashSet::new();
        findings.retain(|f| seen.insert((f.rule_id.clone(), f.span)));
        findings.retain(|f| f.is_diagnostic() || f.severity >= self.threshold);

        findings.sort_by_key(|f| (Reverse(f.severity), f.line(), f.column()));
        findings
    }

    pub fn build(
        &self,
        file_path: &str,
        language: Language,
        findings: Vec<Finding>,
        elapsed: Duration,
    ) -> AnalysisResult {
        let findings = self.finalize(findings);
        AnalysisResult {
            file_path: file_path.to_string(),
            language: Some(language),
            metrics: QualityMetrics::compute(&findings, elapsed),
            findings,
            success: true,
            error_message: None,
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new(Severity::Low)
    }
}
