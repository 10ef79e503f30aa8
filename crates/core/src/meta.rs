//! Meta-Analyzer (§4.8): de-duplication and confidence scoring applied after per-target scanning.

use crate::matcher::in_comment_context;
use crate::types::{Finding, Severity, Source};
use std::collections::HashSet;

/// Keep the first occurrence of each fingerprint by input order; drop the rest.
/// Idempotent: `dedupe(dedupe(x)) == dedupe(x)`.
pub fn dedupe(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen = HashSet::new();
    findings
        .into_iter()
        .filter(|f| seen.insert(f.fingerprint()))
        .collect()
}

const SIGNATURE_BASE: f64 = 0.80;
const HEURISTIC_BASE: f64 = 0.55;

fn path_looks_like_test(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    ["test", "spec", "fixture", "mock", "example"]
        .iter()
        .any(|kw| lower.contains(kw))
}

/// Score one finding per §4.8's multiplicative adjustment chain. `content` is the originating
/// item's full text (for comment-context and match-length inspection); `match_len` is the
/// length of the matched text when known.
pub fn score_confidence(finding: &Finding, content: Option<&str>, match_len: Option<usize>) -> f64 {
    let mut score = match finding.source {
        Source::Signature => SIGNATURE_BASE,
        Source::Heuristic => HEURISTIC_BASE,
    };

    if path_looks_like_test(&finding.file) {
        score *= 0.6;
    }

    if let (Some(content), Some(line)) = (content, finding.line) {
        if let Some(offset) = byte_offset_of_line(content, line) {
            if in_comment_context(content, offset) {
                score *= 0.7;
            }
        }
    }

    if finding.rule_id == "HEURISTIC_HIGH_ENTROPY_SECRET" {
        if let Some(entropy) = extract_entropy(&finding.message) {
            let scaled = ((entropy - 4.2) / 1.8).clamp(0.0, 1.0);
            score = score.max(scaled);
        }
    }

    if finding.source == Source::Signature {
        if let Some(len) = match_len {
            score += (len as f64 / 40.0).min(1.0) * 0.10;
        }
    }

    match finding.severity {
        Severity::Critical => score += 0.05,
        Severity::Low => score -= 0.10,
        _ => {}
    }

    score.clamp(0.0, 1.0)
}

fn byte_offset_of_line(content: &str, line: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let mut current_line = 1;
    let mut offset = 0;
    if current_line == line {
        return Some(offset);
    }
    for (i, c) in content.char_indices() {
        if c == '\n' {
            current_line += 1;
            offset = i + 1;
            if current_line == line {
                return Some(offset);
            }
        }
    }
    None
}

fn extract_entropy(message: &str) -> Option<f64> {
    let start = message.find('(')? + 1;
    let end = message[start..].find(' ')? + start;
    message[start..end].parse().ok()
}

/// Apply confidence scoring to every finding in place, then optionally filter by `min_confidence`.
pub fn apply_confidence(
    mut findings: Vec<Finding>,
    contents_by_file: &std::collections::HashMap<String, String>,
    min_confidence: Option<f64>,
) -> Vec<Finding> {
    for finding in &mut findings {
        let content = contents_by_file.get(&finding.file).map(|s| s.as_str());
        let match_len = finding.match_len;
        finding.confidence = Some(score_confidence(finding, content, match_len));
    }
    if let Some(threshold) = min_confidence {
        findings.retain(|f| f.confidence.unwrap_or(0.0) >= threshold);
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(file: &str, line: Option<usize>) -> Finding {
        Finding {
            rule_id: "R1".into(),
            severity: Severity::High,
            category: None,
            source: Source::Signature,
            message: "m".into(),
            remediation: None,
            file: file.into(),
            line,
            column: None,
            confidence: None,
            match_len: None,
        }
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let findings = vec![sample("a.py", Some(1)), sample("a.py", Some(1))];
        let deduped = dedupe(findings);
        assert_eq!(deduped.len(), 1);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let findings = vec![sample("a.py", Some(1)), sample("b.py", Some(2))];
        let once = dedupe(findings.clone());
        let twice = dedupe(dedupe(findings));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_path_reduces_confidence() {
        let f = sample("tests/fixture.py", Some(1));
        let score = score_confidence(&f, None, None);
        assert!(score < SIGNATURE_BASE);
    }

    #[test]
    fn critical_severity_adds_bonus() {
        let mut f = sample("a.py", Some(1));
        f.severity = Severity::Critical;
        let score = score_confidence(&f, None, None);
        assert!(score > SIGNATURE_BASE);
    }

    #[test]
    fn low_severity_reduces_score() {
        let mut f = sample("a.py", Some(1));
        f.severity = Severity::Low;
        let score = score_confidence(&f, None, None);
        assert!(score < SIGNATURE_BASE);
    }

    #[test]
    fn confidence_clamped_to_unit_interval() {
        let mut f = sample("a.py", Some(1));
        f.severity = Severity::Critical;
        let score = score_confidence(&f, None, Some(1000));
        assert!(score <= 1.0);
    }
}
