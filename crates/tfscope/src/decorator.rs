//! structured-literal classification of token text
//!
//! [classify] scans a token's text for well known shapes (module sources, URLs, paths, emails, addresses, dates, ...)
//! and returns them as [Decorator] spans. Patterns are tried in a fixed precedence order. At a shared start offset
//! the longest match wins (precedence breaks ties) and a match that overlaps an already accepted span is dropped,
//! so the result is sorted and non-overlapping.
use crate::token::{Decorator, DecoratorKind};
use regex::Regex;
use std::sync::LazyLock;

/// Hosts that are classified as [DecoratorKind::RegistryUrl] and never as [DecoratorKind::HttpsUrl]
const REGISTRY_HOSTS: &[&str] = &["registry.terraform.io", "registry.opentofu.org"];

struct Pattern {
    kind: DecoratorKind,
    regex: Regex,
    /// capture group holding the decorated span
    group: usize,
}

impl Pattern {
    fn new(kind: DecoratorKind, pattern: &str, group: usize) -> Self {
        Self {
            kind,
            regex: Regex::new(pattern).expect("decorator patterns are static and must compile"),
            group,
        }
    }
}

static PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    use DecoratorKind::*;
    vec![
        Pattern::new(
            GitSshUrl,
            r"(?:git::)?(?:ssh://)?git@[A-Za-z0-9.-]+[:/][A-Za-z0-9._~/-]+(?:\?ref=[A-Za-z0-9._/-]+)?",
            0,
        ),
        Pattern::new(
            GitHttpsUrl,
            r#"(?:git::)?https://[A-Za-z0-9.-]+(?::\d+)?/[A-Za-z0-9._~/-]+?\.git\b(?:(?://|\?)[^\s"'<>)\]}]*)?"#,
            0,
        ),
        Pattern::new(
            RegistryUrl,
            r"(?:tfr://(?:registry\.(?:terraform\.io|opentofu\.org))?/?|(?:https://)?registry\.(?:terraform\.io|opentofu\.org)/)[A-Za-z0-9._~/-]+(?:\?version=[A-Za-z0-9._-]+)?",
            0,
        ),
        Pattern::new(
            S3Url,
            r#"s3::https://s3(?:[.-][A-Za-z0-9-]+)*\.amazonaws\.com/[^\s"'<>]+|s3://[a-z0-9][a-z0-9.-]*(?:/[^\s"'<>]*)?"#,
            0,
        ),
        Pattern::new(HttpsUrl, r#"https://[^\s"'<>)\]}]+"#, 0),
        Pattern::new(
            FilePath,
            r#"(?:^|[\s"'=(,\[])((?:\.{1,2}/|~/|/)[A-Za-z0-9_.-]+(?:/[A-Za-z0-9_.-]+)*/?)"#,
            1,
        ),
        Pattern::new(
            Email,
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            0,
        ),
        Pattern::new(
            IpAddress,
            r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)(?:/(?:3[0-2]|[12]?\d))?\b",
            0,
        ),
        Pattern::new(
            Date,
            r"\b\d{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12]\d|3[01])\b",
            0,
        ),
        Pattern::new(
            Time,
            r"\b(?:[01]\d|2[0-3]):[0-5]\d(?::[0-5]\d(?:\.\d+)?)?(?:Z|[+-]\d{2}:\d{2})?\b",
            0,
        ),
        Pattern::new(
            Uuid,
            r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
            0,
        ),
    ]
});

/// Classify all structured literals inside `text`
pub fn classify(text: &str) -> Vec<Decorator> {
    // (precedence, candidate)
    let mut candidates: Vec<(usize, Decorator)> = vec![];

    for (precedence, pattern) in PATTERNS.iter().enumerate() {
        for captures in pattern.regex.captures_iter(text) {
            let Some(span) = captures.get(pattern.group) else {
                continue;
            };

            if span.is_empty() {
                continue;
            }

            if pattern.kind == DecoratorKind::HttpsUrl && is_registry_url(span.as_str()) {
                continue;
            }

            candidates.push((
                precedence,
                Decorator::new(pattern.kind, span.start(), span.end()),
            ));
        }
    }

    candidates.sort_by(|(precedence_a, a), (precedence_b, b)| {
        a.start_index
            .cmp(&b.start_index)
            .then(b.len().cmp(&a.len()))
            .then(precedence_a.cmp(precedence_b))
    });

    let mut decorators: Vec<Decorator> = Vec::with_capacity(candidates.len());
    for (_, candidate) in candidates {
        if let Some(last) = decorators.last() {
            if candidate.start_index < last.end_index {
                tracing::trace!(?candidate, kept=?last, "overlapping decorator dropped");
                continue;
            }
        }
        decorators.push(candidate);
    }

    debug_assert!(
        decorators
            .windows(2)
            .all(|pair| pair[0].end_index <= pair[1].start_index),
        "decorators must be sorted and non-overlapping"
    );

    decorators
}

fn is_registry_url(url: &str) -> bool {
    let host = url.trim_start_matches("https://");
    REGISTRY_HOSTS.iter().any(|registry| host.starts_with(registry))
}
