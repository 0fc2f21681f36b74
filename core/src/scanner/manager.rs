use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ast::{detect_language, FrontEndRegistry, Language};
use crate::config::{AnalysisConfig, StyleLimits};
use crate::error::{CoreError, Result};
use crate::rules::{RuleClass, RuleRegistry};
use crate::scanner::engine::{run_rules, Deadline};
use crate::scanner::report::{AnalysisResult, ReportBuilder};
use crate::scanner::severity::{MatchContext, SeverityClassifier};
use crate::scanner::{Finding, SourceUnit};

/// One file of a batch. `id` keys the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchInput {
    pub id: String,
    pub filename: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_hint: Option<String>,
}

impl BatchInput {
    pub fn new(id: impl Into<String>, filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            content: content.into(),
            language_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.language_hint = Some(hint.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: BTreeMap<String, AnalysisResult>,
    /// Inputs never started because the batch was cancelled.
    pub cancelled: Vec<String>,
}

/// Cloneable cancellation flag, checked before each file starts.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Entry point of the core: parse, one rule walk, aggregate.
pub struct Analyzer {
    config: AnalysisConfig,
    enabled: Vec<RuleClass>,
    front_ends: FrontEndRegistry,
    registry: Arc<RuleRegistry>,
    classifier: SeverityClassifier,
    report: ReportBuilder,
    pool: Option<rayon::ThreadPool>,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;

        let registry = if config.custom_rules.is_empty() && config.style == StyleLimits::default() {
            RuleRegistry::shared()
        } else {
            Arc::new(RuleRegistry::from_config(&config)?)
        };
        let classifier = match &config.severity_policy {
            Some(policy) => SeverityClassifier::new(policy)?,
            None => SeverityClassifier::builtin(),
        };
        let pool = if config.parallel_processing {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.max_workers)
                .thread_name(|i| format!("deepreview-worker-{}", i))
                .build()
                .map_err(|e| CoreError::config(format!("cannot start worker pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };

        tracing::info!(
            "analyzer ready: {} rules, checks {:?}, threshold {}",
            registry.len(),
            config.enabled_checks,
            config.severity_threshold
        );
        Ok(Self {
            enabled: config.enabled_classes(),
            report: ReportBuilder::new(config.severity_threshold),
            front_ends: FrontEndRegistry::new(),
            registry,
            classifier,
            pool,
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Analyzes one file. Every failure comes back as a result with a synthetic finding.
    pub fn analyze(&self, content: &str, filename: &str, language_hint: Option<&str>) -> AnalysisResult {
        let started = Instant::now();

        if content.len() > self.config.max_file_size {
            let message = format!(
                "input is {} bytes, limit is {}",
                content.len(),
                self.config.max_file_size
            );
            return self.fail(filename, None, "input-too-large", 1, 1, message, started);
        }

        let language = match self.resolve_language(content, filename, language_hint) {
            Ok(language) => language,
            Err(e) => {
                return self.fail(filename, None, "unsupported-language", 1, 1, e.to_string(), started);
            }
        };

        let deadline = Deadline::after(Duration::from_millis(self.config.timeout_ms));
        let tree = match self
            .front_ends
            .parse_file(content, language, filename, Some(deadline.remaining()))
        {
            Ok(tree) => tree,
            Err(e) => return self.fail_with(filename, Some(language), e, started),
        };

        let unit = SourceUnit::new(filename, content, language, tree);
        let raw = match run_rules(&unit, &self.registry, &self.enabled, Some(deadline)) {
            Ok(raw) => raw,
            Err(e) => return self.fail_with(filename, Some(language), e, started),
        };

        let findings: Vec<Finding> = raw
            .iter()
            .map(|m| {
                let severity = self.classifier.classify(
                    &m.rule,
                    &MatchContext {
                        enclosing_names: &m.enclosing,
                        filename,
                    },
                );
                Finding::from_match(&unit, &m.rule, &m.hit, m.node_span, severity)
            })
            .collect();

        let result = self.report.build(filename, language, findings, started.elapsed());
        tracing::debug!(
            "{} ({}): {} findings, score {}",
            filename,
            language,
            result.findings.len(),
            result.metrics.quality_score
        );
        result
    }

    fn resolve_language(&self, content: &str, filename: &str, hint: Option<&str>) -> Result<Language> {
        let language = match hint {
            Some(hint) => hint
                .parse::<Language>()
                .map_err(CoreError::UnsupportedLanguage)?,
            None => detect_language(filename, content).ok_or_else(|| {
                CoreError::UnsupportedLanguage(format!("cannot determine the language of `{}`", filename))
            })?,
        };
        if !self.config.languages.contains(&language) {
            return Err(CoreError::UnsupportedLanguage(format!(
                "{} is not enabled",
                language
            )));
        }
        Ok(language)
    }

    fn fail_with(&self, filename: &str, language: Option<Language>, error: CoreError, started: Instant) -> AnalysisResult {
        let (line, column) = match &error {
            CoreError::Parse(e) => (e.line, e.column),
            _ => (1, 1),
        };
        self.fail(filename, language, error.diagnostic_id(), line, column, error.to_string(), started)
    }

    #[allow(clippy::too_many_arguments)]
    fn fail(
        &self,
        filename: &str,
        language: Option<Language>,
        rule_id: &str,
        line: usize,
        column: usize,
        message: String,
        started: Instant,
    ) -> AnalysisResult {
        tracing::warn!("{}: {} ({})", filename, message, rule_id);
        let finding = Finding::diagnostic(filename, rule_id, line, column, message.clone());
        AnalysisResult::failure(filename, language, finding, message, started.elapsed())
    }

    /// Analyzes independent files, in parallel when configured. Results are keyed by input id.
    pub fn analyze_batch(&self, inputs: Vec<BatchInput>, cancel: &CancellationToken) -> BatchReport {
        let run = |input: &BatchInput| -> (String, Option<AnalysisResult>) {
            if cancel.is_cancelled() {
                return (input.id.clone(), None);
            }
            let result = self.analyze(&input.content, &input.filename, input.language_hint.as_deref());
            (input.id.clone(), Some(result))
        };

        let outcomes: Vec<(String, Option<AnalysisResult>)> = match &self.pool {
            Some(pool) => pool.install(|| inputs.par_iter().map(run).collect()),
            None => inputs.iter().map(run).collect(),
        };

        let mut report = BatchReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Some(result) => {
                    if report.results.insert(id.clone(), result).is_some() {
                        tracing::warn!("duplicate batch id `{}`; keeping the later result", id);
                    }
                }
                None => report.cancelled.push(id),
            }
        }
        tracing::info!(
            "batch finished: {} analyzed, {} cancelled",
            report.results.len(),
            report.cancelled.len()
        );
        report
    }
}

impl Default for Analyzer {
    /// Built-in rules and policy, sequential batches.
    fn default() -> Self {
        let config = AnalysisConfig {
            parallel_processing: false,
            ..AnalysisConfig::default()
        };
        Self {
            enabled: config.enabled_classes(),
            report: ReportBuilder::new(config.severity_threshold),
            front_ends: FrontEndRegistry::new(),
            registry: RuleRegistry::shared(),
            classifier: SeverityClassifier::builtin(),
            pool: None,
            config,
        }
    }
}

/// Collects supported source files under `root` (gitignore aware) as batch inputs.
/// Ids are paths relative to `root`.
pub fn inputs_from_dir<P: AsRef<Path>>(root: P) -> Result<Vec<BatchInput>> {
    let root = root.as_ref();
    let mut inputs = Vec::new();

    for entry in ignore::WalkBuilder::new(root).build() {
        let entry = entry.map_err(|e| CoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        if Language::from_path(path).is_none() {
            continue;
        }
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let id = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        inputs.push(BatchInput::new(id.clone(), id, content));
    }

    inputs.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ParseError;

    #[test]
    fn cancelled_batch_reports_every_id() {
        let analyzer = Analyzer::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let inputs = vec![
            BatchInput::new("a", "a.py", "x = 1\n"),
            BatchInput::new("b", "b.py", "y = 2\n"),
        ];
        let report = analyzer.analyze_batch(inputs, &cancel);
        assert!(report.results.is_empty());
        assert_eq!(report.cancelled, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn each_error_keeps_its_own_diagnostic() {
        let analyzer = Analyzer::default();
        let cases = [
            (CoreError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")), "io-failure"),
            (
                CoreError::RuleEvaluation {
                    rule_id: "r".to_string(),
                    message: "boom".to_string(),
                },
                "rule-evaluation-failure",
            ),
            (CoreError::config("bad"), "invalid-configuration"),
            (CoreError::Timeout { limit_ms: 5 }, "timeout-exceeded"),
        ];
        for (error, expected) in cases {
            let result = analyzer.fail_with("a.py", Some(Language::Python), error, Instant::now());
            assert!(!result.success);
            assert_eq!(result.findings.len(), 1);
            assert_eq!(result.findings[0].rule_id, expected);
            assert_eq!((result.findings[0].line(), result.findings[0].column()), (1, 1));
        }

        let parse = CoreError::Parse(ParseError {
            line: 3,
            column: 7,
            message: "unexpected `)`".to_string(),
        });
        let result = analyzer.fail_with("a.py", Some(Language::Python), parse, Instant::now());
        assert_eq!(result.findings[0].rule_id, "parse-failure");
        assert_eq!((result.findings[0].line(), result.findings[0].column()), (3, 7));
    }

    #[test]
    fn oversized_input_is_a_diagnostic() {
        let config = AnalysisConfig {
            max_file_size: 10,
            parallel_processing: false,
            ..AnalysisConfig::default()
        };
        let analyzer = Analyzer::new(config).unwrap();
        let result = analyzer.analyze("print('hello world')\n", "a.py", None);
        assert!(!result.success);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].rule_id, "input-too-large");
    }

    #[test]
    fn disabled_language_is_unsupported() {
        let config = AnalysisConfig {
            languages: [Language::Python].into_iter().collect(),
            parallel_processing: false,
            ..AnalysisConfig::default()
        };
        let analyzer = Analyzer::new(config).unwrap();
        let result = analyzer.analyze("const a = 1;\n", "a.js", None);
        assert_eq!(result.findings[0].rule_id, "unsupported-language");
        assert_eq!(result.language, None);
    }

    #[test]
    fn hint_overrides_extension() {
        let analyzer = Analyzer::default();
        let result = analyzer.analyze("x = 1\n", "snippet.txt", Some("py"));
        assert!(result.success);
        assert_eq!(result.language, Some(Language::Python));

        let result = analyzer.analyze("x = 1\n", "snippet.py", Some("cobol"));
        assert_eq!(result.findings[0].rule_id, "unsupported-language");
    }

    #[test]
    fn directory_inputs_respect_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg").join("mod.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("app.js"), "let y = 2;\n").unwrap();
        std::fs::write(dir.path().join("README.md"), "# readme\n").unwrap();

        let inputs = inputs_from_dir(dir.path()).unwrap();
        let ids: Vec<&str> = inputs.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["app.js", "pkg/mod.py"]);
    }
}
