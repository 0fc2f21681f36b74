// tests/integration_batch.rs
use deepreview_core::{inputs_from_dir, AnalysisConfig, Analyzer, BatchInput, CancellationToken};

fn five_files() -> Vec<BatchInput> {
    vec![
        BatchInput::new("one", "one.py", "def one():\n    return 1\n"),
        BatchInput::new("two", "two.js", "function two() { return 2; }\n"),
        BatchInput::new("broken", "broken.py", "def broken(:\n    pass\n"),
        BatchInput::new("four", "Four.java", "class Four { int four() { return 4; } }\n"),
        BatchInput::new("five", "five", "x = 5\n").with_hint("python"),
    ]
}

fn parallel_analyzer() -> Analyzer {
    let config = AnalysisConfig {
        parallel_processing: true,
        max_workers: 3,
        ..AnalysisConfig::default()
    };
    Analyzer::new(config).unwrap()
}

#[test]
fn malformed_file_does_not_affect_the_others() {
    let report = parallel_analyzer().analyze_batch(five_files(), &CancellationToken::new());
    assert_eq!(report.results.len(), 5);
    assert!(report.cancelled.is_empty());

    let broken = &report.results["broken"];
    assert!(!broken.success);
    assert_eq!(broken.findings.len(), 1);
    assert_eq!(broken.findings[0].rule_id, "parse-failure");

    for id in ["one", "two", "four", "five"] {
        let result = &report.results[id];
        assert!(result.success, "{} failed: {:?}", id, result.error_message);
        assert!(result.findings.is_empty(), "{}: {:?}", id, result.findings);
    }
}

#[test]
fn parallel_and_sequential_agree() {
    let sequential = Analyzer::new(AnalysisConfig {
        parallel_processing: false,
        ..AnalysisConfig::default()
    })
    .unwrap();
    let token = CancellationToken::new();
    let a = parallel_analyzer().analyze_batch(five_files(), &token);
    let b = sequential.analyze_batch(five_files(), &token);

    let keys_a: Vec<&String> = a.results.keys().collect();
    let keys_b: Vec<&String> = b.results.keys().collect();
    assert_eq!(keys_a, keys_b);
    for (id, result) in &a.results {
        let other = &b.results[id];
        assert_eq!(result.findings, other.findings, "{}", id);
    }
}

#[test]
fn cancellation_is_checked_between_files() {
    let token = CancellationToken::new();
    let clone = token.clone();
    clone.cancel();
    assert!(token.is_cancelled());

    let report = parallel_analyzer().analyze_batch(five_files(), &token);
    assert!(report.results.is_empty());
    assert_eq!(report.cancelled.len(), 5);
}

#[test]
fn tiny_timeout_yields_timeout_findings() {
    let config = AnalysisConfig {
        timeout_ms: 1,
        parallel_processing: false,
        ..AnalysisConfig::default()
    };
    let analyzer = Analyzer::new(config).unwrap();
    let big = "def f(x):\n    if x:\n        y = x + 1\n".repeat(20_000);
    let result = analyzer.analyze(&big, "big.py", None);
    assert!(!result.success);
    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].rule_id, "timeout-exceeded");
}

#[test]
fn directory_walk_feeds_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.py"), "password = \"p4ss\"\n").unwrap();
    std::fs::write(dir.path().join("b.ts"), "const n: number = 1;\n").unwrap();
    std::fs::write(dir.path().join("c.txt"), "not code").unwrap();

    let inputs = inputs_from_dir(dir.path()).unwrap();
    assert_eq!(inputs.len(), 2);

    let report = parallel_analyzer().analyze_batch(inputs, &CancellationToken::new());
    assert_eq!(report.results["a.py"].findings[0].rule_id, "hardcoded-secret");
    assert!(report.results["b.ts"].findings.is_empty());
}

#[test]
fn deeply_nested_file_fails_alone_in_a_parallel_batch() {
    let depth = 6_000;
    let deep = format!("x = {}{}\n", "[".repeat(depth), "]".repeat(depth));
    let inputs = vec![
        BatchInput::new("deep", "deep.py", deep),
        BatchInput::new("clean", "clean.py", "def ok():\n    return 1\n"),
    ];

    let report = parallel_analyzer().analyze_batch(inputs, &CancellationToken::new());
    assert_eq!(report.results.len(), 2);

    let deep = &report.results["deep"];
    assert!(!deep.success);
    assert_eq!(deep.findings.len(), 1);
    assert_eq!(deep.findings[0].rule_id, "parse-failure");
    assert!(deep.findings[0].message.contains("nesting exceeds"));

    let clean = &report.results["clean"];
    assert!(clean.success);
    assert!(clean.findings.is_empty());
}
