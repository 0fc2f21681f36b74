use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// Languages with a registered front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Java,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyw"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "tsx", "mts", "cts"],
            Language::Java => &["java"],
        }
    }

    pub fn from_extension(ext: &str) -> Option<Language> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    pub fn from_path(path: &Path) -> Option<Language> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Language::from_extension)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" | "jsx" => Ok(Language::JavaScript),
            "typescript" | "ts" | "tsx" => Ok(Language::TypeScript),
            "java" => Ok(Language::Java),
            other => Err(format!("unknown language `{}`", other)),
        }
    }
}

struct ContentMarkers {
    python: Vec<Regex>,
    javascript: Vec<Regex>,
    typescript: Vec<Regex>,
    java: Vec<Regex>,
}

fn markers() -> &'static ContentMarkers {
    static MARKERS: OnceLock<ContentMarkers> = OnceLock::new();
    MARKERS.get_or_init(|| {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect()
        };
        ContentMarkers {
            // indentation-significant blocks
            python: compile(&[
                r"^def\s+\w+\s*\(.*\)\s*(->\s*[^:]+)?:$",
                r"^class\s+\w+\s*(\(.*\))?\s*:$",
                r"^from\s+[\w.]+\s+import\s+",
                r"^import\s+[\w.]+(\s+as\s+\w+)?$",
                r"^(if|elif|while|for|with|try|except|else)\b.*:$",
                r"^print\(",
            ]),
            // semicolon-terminated block syntax
            javascript: compile(&[
                r"^function\s*\*?\s*\w*\s*\(",
                r"^(const|let|var)\s+[\w{\[]",
                r"=>\s*[{(]?",
                r"\bconsole\.\w+\(",
                r"\brequire\(\s*['\x22]",
                r"^export\s+(default\s+)?(function|const|class|let)",
                r"^module\.exports\s*=",
            ]),
            typescript: compile(&[
                r"^(export\s+)?interface\s+\w+",
                r"^(export\s+)?type\s+\w+\s*(<.*>)?\s*=",
                r"\w+\s*:\s*(string|number|boolean|void|any|unknown)\b",
                r"^(export\s+)?enum\s+\w+\s*\{",
            ]),
            // class-centric declarations
            java: compile(&[
                r"^package\s+[\w.]+;$",
                r"^import\s+(static\s+)?[\w.]+(\.\*)?;$",
                r"^(public|private|protected)?\s*(abstract\s+|final\s+)*(class|interface|enum)\s+\w+",
                r"^(public|private|protected)\s+(static\s+)?[\w<>\[\],\s]+\s+\w+\s*\(",
                r"\bSystem\.(out|err)\.print",
            ]),
        }
    })
}

/// Picks a language for `filename`/`content`.
///
/// Extension wins. Content heuristics run only when the extension is missing or
/// unknown, and return `None` when no language scores strictly higher than the rest.
pub fn detect_language(filename: &str, content: &str) -> Option<Language> {
    if let Some(lang) = Language::from_path(Path::new(filename)) {
        return Some(lang);
    }
    detect_from_content(content)
}

fn detect_from_content(content: &str) -> Option<Language> {
    let markers = markers();
    let mut python = 0usize;
    let mut script = 0usize;
    let mut typed = 0usize;
    let mut java = 0usize;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") || line.starts_with('*') {
            continue;
        }
        let hits = |set: &[Regex]| set.iter().filter(|re| re.is_match(line)).count();
        python += hits(&markers.python);
        script += hits(&markers.javascript);
        typed += hits(&markers.typescript);
        java += hits(&markers.java);
    }

    let script_family = script + typed;
    let scores = [
        (Language::Python, python),
        (Language::JavaScript, script_family),
        (Language::Java, java),
    ];
    let best = scores.iter().max_by_key(|(_, score)| *score)?;
    if best.1 == 0 {
        return None;
    }
    let tied = scores
        .iter()
        .filter(|(lang, score)| *lang != best.0 && *score == best.1)
        .count();
    if tied > 0 {
        tracing::debug!("content heuristics tied at score {}", best.1);
        return None;
    }

    match best.0 {
        Language::JavaScript if typed > 0 => Some(Language::TypeScript),
        lang => Some(lang),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_takes_precedence() {
        let python_looking = "def main():\n    return 1\n";
        assert_eq!(detect_language("App.java", python_looking), Some(Language::Java));
        assert_eq!(detect_language("index.MJS", ""), Some(Language::JavaScript));
        assert_eq!(detect_language("view.tsx", ""), Some(Language::TypeScript));
    }

    #[test]
    fn content_heuristics_by_block_style() {
        let py = "import os\n\ndef run(x):\n    if x:\n        return 1\n";
        assert_eq!(detect_language("", py), Some(Language::Python));

        let js = "const a = require('a');\nfunction go() {\n  console.log(a);\n}\n";
        assert_eq!(detect_language("script", js), Some(Language::JavaScript));

        let java = "package com.acme;\nimport java.util.List;\npublic class A {\n}\n";
        assert_eq!(detect_language("A", java), Some(Language::Java));

        let ts = "interface User {\n  name: string;\n}\nconst u = 1;\n";
        assert_eq!(detect_language("", ts), Some(Language::TypeScript));
    }

    #[test]
    fn unknown_instead_of_guessing() {
        assert_eq!(detect_language("notes.txt", "hello world\nnothing here"), None);
        assert_eq!(detect_language("", ""), None);
    }

    #[test]
    fn tied_scores_are_unknown() {
        // one python marker against one java marker
        let mixed = "def run(x):\npackage com.acme;\n";
        assert_eq!(detect_from_content(mixed), None);

        let python_ahead = "def run(x):\nprint(x)\npackage com.acme;\n";
        assert_eq!(detect_from_content(python_ahead), Some(Language::Python));
    }

    #[test]
    fn hint_aliases() {
        assert_eq!("PY".parse::<Language>(), Ok(Language::Python));
        assert_eq!("tsx".parse::<Language>(), Ok(Language::TypeScript));
        assert!("cobol".parse::<Language>().is_err());
    }
}
