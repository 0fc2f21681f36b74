// tests/integration_enhance.rs
use std::time::Duration;

use async_trait::async_trait;
use deepreview_core::{enhance_result, Analyzer, Enhancement, Enhancer, Finding, SourceContext};

struct Annotator;

#[async_trait]
impl Enhancer for Annotator {
    fn name(&self) -> String {
        "annotator".to_string()
    }

    async fn enhance(&self, finding: &Finding, context: &SourceContext) -> Option<Enhancement> {
        Some(Enhancement {
            message: Some(format!("{} (context starts at line {})", finding.message, context.first_line)),
            suggestion: Some(format!("see {} lines of context", context.lines.len())),
        })
    }
}

struct Silent;

#[async_trait]
impl Enhancer for Silent {
    fn name(&self) -> String {
        "silent".to_string()
    }

    async fn enhance(&self, _finding: &Finding, _context: &SourceContext) -> Option<Enhancement> {
        None
    }
}

struct Sleepy;

#[async_trait]
impl Enhancer for Sleepy {
    fn name(&self) -> String {
        "sleepy".to_string()
    }

    async fn enhance(&self, _finding: &Finding, _context: &SourceContext) -> Option<Enhancement> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Some(Enhancement {
            message: Some("too late".to_string()),
            suggestion: None,
        })
    }
}

const CODE: &str = "import hashlib\n\ndef fingerprint(data):\n    return hashlib.md5(data).hexdigest()\n";

#[tokio::test]
async fn enhancement_changes_text_only() {
    let analyzer = Analyzer::default();
    let plain = analyzer.analyze(CODE, "fp.py", None);
    assert!(!plain.findings.is_empty());

    let enhanced = enhance_result(plain.clone(), CODE, &Annotator, Duration::from_secs(1)).await;
    assert_eq!(enhanced.findings.len(), plain.findings.len());
    for (before, after) in plain.findings.iter().zip(&enhanced.findings) {
        assert_eq!(before.rule_id, after.rule_id);
        assert_eq!(before.severity, after.severity);
        assert_eq!(before.span, after.span);
        assert_ne!(before.message, after.message);
        assert!(after.message.contains("context starts at line 1"));
    }
}

#[tokio::test]
async fn silent_enhancer_is_identity() {
    let analyzer = Analyzer::default();
    let plain = analyzer.analyze(CODE, "fp.py", None);
    let enhanced = enhance_result(plain.clone(), CODE, &Silent, Duration::from_secs(1)).await;
    assert_eq!(plain, enhanced);
}

#[tokio::test]
async fn slow_enhancer_times_out_without_changes() {
    let analyzer = Analyzer::default();
    let plain = analyzer.analyze(CODE, "fp.py", None);
    let enhanced = enhance_result(plain.clone(), CODE, &Sleepy, Duration::from_millis(20)).await;
    assert_eq!(plain.findings, enhanced.findings);
}

#[tokio::test]
async fn diagnostics_are_not_enhanced() {
    let analyzer = Analyzer::default();
    let failed = analyzer.analyze("def (:\n", "bad.py", None);
    let enhanced = enhance_result(failed.clone(), "def (:\n", &Annotator, Duration::from_secs(1)).await;
    assert_eq!(failed.findings, enhanced.findings);
}
