//! Fix Mode (§4.11): the one form of "live editing" this engine performs — inserting a
//! language-appropriate line-comment prefix ahead of a signature finding's matched line.
//! Heuristic findings are never auto-fixed, and JSON is explicitly excluded even though
//! `json`/`manifest` content is otherwise scannable.

use crate::types::{Finding, Source};
use std::collections::BTreeMap;
use std::path::Path;

/// Extension → single-line comment token. Anything not listed here is not fixable.
fn comment_token(virtual_path: &str) -> Option<&'static str> {
    let ext = Path::new(virtual_path)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    match ext.as_str() {
        "md" | "mdx" | "txt" | "rst" | "yaml" | "yml" | "toml" | "ini" | "cfg" | "conf" => {
            Some("#")
        }
        "sh" | "bash" => Some("#"),
        "py" => Some("#"),
        "js" | "mjs" | "cjs" | "jsx" | "ts" | "tsx" => Some("//"),
        _ => None,
    }
}

/// One file's worth of applied edits.
#[derive(Debug, Clone)]
pub struct FixResult {
    pub file: String,
    pub lines_fixed: usize,
}

/// Apply in-place line-comment fixes for every fixable signature finding, grouped by
/// file so each distinct line is commented exactly once even if several findings landed
/// on it. Returns one [`FixResult`] per file actually modified.
pub fn apply_fixes(findings: &[Finding]) -> std::io::Result<Vec<FixResult>> {
    let mut by_file: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for finding in findings {
        if finding.source != Source::Signature {
            continue;
        }
        let Some(line) = finding.line else { continue };
        if comment_token(&finding.file).is_none() {
            continue;
        }
        by_file.entry(finding.file.as_str()).or_default().push(line);
    }

    let mut results = Vec::new();
    for (file, mut lines) in by_file {
        lines.sort_unstable();
        lines.dedup();
        let token = comment_token(file).expect("filtered above");

        let Ok(original) = std::fs::read_to_string(file) else {
            continue;
        };
        let mut out_lines: Vec<String> = original.lines().map(str::to_string).collect();
        let mut fixed = 0usize;
        for line in &lines {
            let idx = line.saturating_sub(1);
            if let Some(existing) = out_lines.get_mut(idx) {
                let trimmed = existing.trim_start();
                if !trimmed.starts_with(token) {
                    *existing = format!("{token} {existing}");
                    fixed += 1;
                }
            }
        }
        if fixed > 0 {
            let mut rendered = out_lines.join("\n");
            if original.ends_with('\n') {
                rendered.push('\n');
            }
            std::fs::write(file, rendered)?;
        }
        results.push(FixResult {
            file: file.to_string(),
            lines_fixed: fixed,
        });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use std::io::Write;

    fn finding(file: &str, line: usize, source: Source) -> Finding {
        Finding {
            rule_id: "R1".into(),
            severity: Severity::High,
            category: None,
            source,
            message: "m".into(),
            remediation: None,
            file: file.to_string(),
            line: Some(line),
            column: None,
            confidence: None,
            match_len: None,
        }
    }

    #[test]
    fn comments_out_matched_line() {
        let mut f = tempfile::Builder::new().suffix(".py").tempfile().unwrap();
        writeln!(f, "line one").unwrap();
        writeln!(f, "password = 'hunter2'").unwrap();
        let path = f.path().to_string_lossy().to_string();

        let findings = vec![finding(&path, 2, Source::Signature)];
        let results = apply_fixes(&findings).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].lines_fixed, 1);

        let updated = std::fs::read_to_string(&path).unwrap();
        assert!(updated.lines().nth(1).unwrap().starts_with('#'));
    }

    #[test]
    fn json_is_never_fixed() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(f, r#"{{"key": "value"}}"#).unwrap();
        let path = f.path().to_string_lossy().to_string();

        let findings = vec![finding(&path, 1, Source::Signature)];
        let results = apply_fixes(&findings).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn heuristic_findings_are_never_fixed() {
        let mut f = tempfile::Builder::new().suffix(".py").tempfile().unwrap();
        writeln!(f, "x = 1").unwrap();
        let path = f.path().to_string_lossy().to_string();

        let findings = vec![finding(&path, 1, Source::Heuristic)];
        let results = apply_fixes(&findings).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn duplicate_findings_on_same_line_produce_one_edit() {
        let mut f = tempfile::Builder::new().suffix(".py").tempfile().unwrap();
        writeln!(f, "secret = 1").unwrap();
        let path = f.path().to_string_lossy().to_string();

        let findings = vec![
            finding(&path, 1, Source::Signature),
            finding(&path, 1, Source::Signature),
        ];
        let results = apply_fixes(&findings).unwrap();
        assert_eq!(results[0].lines_fixed, 1);
    }
}
