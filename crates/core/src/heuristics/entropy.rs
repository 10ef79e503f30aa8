//! Entropy Detector (§4.4.1): flags high-Shannon-entropy tokens as likely secrets.

use crate::types::{Finding, Severity, Source, MAX_ENTROPY_FINDINGS, MAX_ENTROPY_TOKENS};
use std::collections::HashMap;

const MIN_TOKEN_LEN: usize = 20;
const MIN_ENTROPY_BITS: f64 = 4.2;

fn is_candidate_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '_' | '=' | '-')
}

fn shannon_entropy(token: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in token.chars() {
        *counts.entry(c).or_insert(0) += 1;
    }
    let len = token.chars().count() as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Maximal runs of the candidate character class (length >= 20), paired with their byte
/// offset in `content`. Any other character — whitespace, quotes, punctuation — breaks a run,
/// so a quoted literal like `"aB3xQ9..."` still yields the token between the quotes.
fn candidate_tokens(content: &str) -> Vec<(usize, &str)> {
    fn push_token<'a>(content: &'a str, s: usize, e: usize, tokens: &mut Vec<(usize, &'a str)>) {
        let tok = &content[s..e];
        if tok.chars().count() >= MIN_TOKEN_LEN {
            tokens.push((s, tok));
        }
    }

    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in content.char_indices() {
        if is_candidate_char(c) {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            push_token(content, s, i, &mut tokens);
        }
    }
    if let Some(s) = start {
        push_token(content, s, content.len(), &mut tokens);
    }
    tokens.truncate(MAX_ENTROPY_TOKENS);
    tokens
}

pub fn analyze(content: &str, virtual_path: &str) -> Vec<Finding> {
    let line_starts: Vec<usize> = {
        let mut v = vec![0];
        v.extend(content.match_indices('\n').map(|(i, _)| i + 1));
        v
    };
    let locate = |offset: usize| -> usize {
        match line_starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    };

    let mut findings = Vec::new();
    for (offset, token) in candidate_tokens(content) {
        if findings.len() >= MAX_ENTROPY_FINDINGS {
            break;
        }
        let entropy = shannon_entropy(token);
        if entropy >= MIN_ENTROPY_BITS {
            findings.push(Finding {
                rule_id: "HEURISTIC_HIGH_ENTROPY_SECRET".to_string(),
                severity: Severity::High,
                category: Some("secrets".to_string()),
                source: Source::Heuristic,
                message: format!(
                    "High-entropy token ({:.2} bits/char) resembles a secret",
                    entropy
                ),
                remediation: Some(
                    "Move secrets out of source into environment variables or a vault.".to_string(),
                ),
                file: virtual_path.to_string(),
                line: Some(locate(offset)),
                column: None,
                confidence: None,
                match_len: Some(token.len()),
            });
        }
    }
    findings
}
