// Security rule set - SQL 注入、硬编码密钥、弱加密算法

use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{LiteralKind, NodeData, NodeKind, OtherShape, SyntaxNode};
use crate::rules::context::{arguments, binding_name, name_words, operands, RuleContext};
use crate::rules::{Rule, RuleClass, RuleMatch, Severity};

const SQL_SINKS: &[&str] = &[
    "execute",
    "executemany",
    "executescript",
    "query",
    "raw",
    "executequery",
    "executeupdate",
    "executelargeupdate",
    "preparestatement",
    "preparecall",
    "createquery",
    "createnativequery",
    "createsqlquery",
    "rawquery",
    "execsql",
    "addbatch",
];

const SECRET_WORDS: &[&str] = &["password", "passwd", "secret", "key", "token", "apikey"];

const WEAK_ALGORITHMS: &[&str] = &[
    "md2", "md4", "md5", "sha1", "sha-1", "des", "desede", "3des", "tripledes", "rc2", "rc4",
    "arc4", "blowfish",
];

pub fn rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "sql-injection",
            RuleClass::Security,
            Severity::Critical,
            &[NodeKind::Call],
            sql_injection,
        )
        .named("SQL built from strings")
        .message("Query passed to `{sink}` is assembled from strings")
        .suggestion("Pass user values as bound parameters instead of concatenating them into the query.")
        .explanation(
            "The first argument to `{sink}` is built by concatenation, interpolation or \
             formatting. Any caller-controlled part can change the structure of the query.",
        )
        .cwe("CWE-89"),
        Rule::new(
            "hardcoded-secret",
            RuleClass::Security,
            Severity::High,
            &[NodeKind::Declaration, NodeKind::Assignment],
            hardcoded_secret,
        )
        .named("Hardcoded secret")
        .message("`{name}` is initialised with a hardcoded secret")
        .suggestion("Load `{name}` from the environment or a secret store.")
        .explanation(
            "Secrets committed with the source end up in every copy and every history of the \
             repository and cannot be rotated without a release.",
        )
        .cwe("CWE-798"),
        Rule::new(
            "weak-crypto",
            RuleClass::Security,
            Severity::Medium,
            &[NodeKind::Call],
            weak_crypto,
        )
        .named("Weak cryptographic primitive")
        .message("`{primitive}` is a broken or deprecated primitive")
        .suggestion("Use SHA-256 or better for hashing and AES-GCM (or ChaCha20-Poly1305) for encryption.")
        .explanation(
            "`{primitive}` has practical collision or key-recovery attacks and must not protect \
             passwords, tokens or integrity-sensitive data.",
        )
        .cwe("CWE-327"),
    ]
}

fn is_string(node: &SyntaxNode) -> bool {
    node.string_value().is_some()
}

fn is_dynamic(node: &SyntaxNode) -> bool {
    node.descendants().any(|n| {
        matches!(
            n.data,
            NodeData::Other(OtherShape::Identifier(_))
                | NodeData::Other(OtherShape::Member { .. })
                | NodeData::Other(OtherShape::Index { .. })
                | NodeData::Call { .. }
        )
    })
}

/// True when `node` builds a string from dynamic parts.
fn is_built_string(node: &SyntaxNode) -> bool {
    match &node.data {
        NodeData::Literal {
            kind: LiteralKind::Template { interpolated },
            ..
        } => *interpolated,
        NodeData::Other(OtherShape::Binary { operator }) => match operator.as_str() {
            "+" => node.descendants().any(is_string) && is_dynamic(node),
            "%" => operands(node).is_some_and(|(left, right)| is_string(left) && is_dynamic(right)),
            _ => false,
        },
        NodeData::Call { callee, name, .. } => {
            (name == "format" && callee.starts_with(['"', '\'']))
                || callee == "String.format"
        }
        _ => false,
    }
}

fn sql_injection(ctx: &RuleContext<'_>) -> Vec<RuleMatch> {
    let NodeData::Call { name, .. } = &ctx.node.data else {
        return Vec::new();
    };
    let sink = name.to_lowercase();
    if !SQL_SINKS.contains(&sink.as_str()) {
        return Vec::new();
    }
    let Some(query) = arguments(ctx.node).first().copied() else {
        return Vec::new();
    };

    let built = is_built_string(query)
        || query.identifier().is_some_and(|ident| {
            let at = ctx.node.span.start_byte;
            let assigned = ctx
                .last_binding(ident, at)
                .and_then(|(_, value)| value)
                .is_some_and(is_built_string);
            let appended = ctx.scope().descendants_in_scope().any(|n| {
                n.span.end_byte <= at
                    && binding_name(n) == Some(ident)
                    && matches!(&n.data, NodeData::Assignment { operator, .. } if operator == "+=")
                    && n.value().is_some_and(is_dynamic)
            });
            assigned || appended
        });
    if !built {
        return Vec::new();
    }
    vec![RuleMatch::here().with("sink", name.as_str())]
}

fn hardcoded_secret(ctx: &RuleContext<'_>) -> Vec<RuleMatch> {
    let node = ctx.node;
    if let NodeData::Assignment { operator, .. } = &node.data {
        if operator != "=" {
            return Vec::new();
        }
    }
    let Some(full_name) = binding_name(node) else {
        return Vec::new();
    };
    let name = full_name.rsplit('.').next().unwrap_or(full_name);
    if !name_words(name)
        .iter()
        .any(|w| SECRET_WORDS.contains(&w.as_str()))
    {
        return Vec::new();
    }

    let literal = node.value().and_then(|v| match &v.data {
        NodeData::Literal {
            kind: LiteralKind::Str | LiteralKind::Template { interpolated: false },
            value,
        } => Some(value.as_str()),
        _ => None,
    });
    match literal {
        Some(value) if !value.trim().is_empty() => vec![RuleMatch::here().with("name", name)],
        _ => Vec::new(),
    }
}

fn weak_hash_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(md5|md4|md2|sha1|sha)(hex|digest)?$").expect("weak hash pattern"))
}

fn weak_algorithm(spec: &str) -> bool {
    let spec = spec.to_lowercase();
    let algorithm = spec.split('/').next().unwrap_or("");
    WEAK_ALGORITHMS.contains(&algorithm)
        || algorithm.starts_with("des-")
        || algorithm.starts_with("rc4-")
        || algorithm.starts_with("bf-")
        || spec.contains("ecb")
}

fn weak_crypto(ctx: &RuleContext<'_>) -> Vec<RuleMatch> {
    let NodeData::Call {
        name,
        receiver,
        constructor,
        ..
    } = &ctx.node.data
    else {
        return Vec::new();
    };

    let lowered = name.to_lowercase();
    if !*constructor && weak_hash_name().is_match(&lowered) {
        return vec![RuleMatch::here().with("primitive", name.as_str())];
    }

    let factory = matches!(
        name.as_str(),
        "getInstance" | "createHash" | "createCipher" | "createCipheriv" | "createDecipheriv" | "new"
    );
    if factory {
        let algorithm = arguments(ctx.node)
            .first()
            .and_then(|a| a.string_value())
            .map(str::to_string);
        if let Some(algorithm) = algorithm {
            // Cipher.getInstance("AES") defaults to ECB
            let bare_aes = receiver.as_deref() == Some("Cipher") && algorithm.eq_ignore_ascii_case("aes");
            if weak_algorithm(&algorithm) || bare_aes {
                return vec![RuleMatch::here().with("primitive", algorithm)];
            }
        }
        if name == "new" {
            if let Some(cipher) = receiver.as_deref() {
                if matches!(cipher, "DES" | "DES3" | "ARC2" | "ARC4" | "Blowfish") {
                    return vec![RuleMatch::here().with("primitive", cipher)];
                }
            }
        }
    }
    Vec::new()
}
