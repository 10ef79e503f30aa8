//! Signature Matcher: applies compiled patterns to text, emitting Findings with line/column.

use crate::engine::RuleIndex;
use crate::types::{Finding, Source, MAX_FINDINGS_PER_RULE};

/// Cumulative line-start byte-offset index, built once per content item.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn build(content: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    /// 1-indexed line and 1-indexed column for a byte offset.
    fn locate(&self, offset: usize) -> (usize, usize) {
        let line_idx = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.starts[line_idx];
        (line_idx + 1, offset - line_start + 1)
    }
}

fn looks_like_comment(content: &str, line_start_offset: usize) -> bool {
    let rest = &content[line_start_offset..];
    let trimmed = rest.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with('#') || trimmed.starts_with('*')
}

/// Match all applicable rules in `index` against `content`, tagged with `virtual_path`.
pub fn match_content(
    content: &str,
    virtual_path: &str,
    file_type: crate::types::FileType,
    index: &RuleIndex,
) -> Vec<Finding> {
    let applicable = index.applicable(file_type);
    if applicable.is_empty() {
        return Vec::new();
    }
    let line_index = LineIndex::build(content);
    let mut findings = Vec::new();

    for rule in applicable {
        let mut emitted = 0usize;
        'patterns: for pattern in &rule.patterns {
            let mut pos = 0usize;
            while pos <= content.len() {
                let Some(m) = pattern.find_at(content, pos) else {
                    break;
                };
                if m.end() == m.start() {
                    pos = m.start() + 1;
                    continue;
                }
                pos = m.end();

                let matched_text = m.as_str();
                if rule
                    .exclude_patterns
                    .iter()
                    .any(|ex| ex.is_match(matched_text))
                {
                    continue;
                }

                let (line, column) = line_index.locate(m.start());
                findings.push(Finding {
                    rule_id: rule.id.clone(),
                    severity: rule.severity,
                    category: Some(rule.category.clone()),
                    source: Source::Signature,
                    message: rule
                        .description
                        .clone()
                        .unwrap_or_else(|| format!("rule {} matched", rule.id)),
                    remediation: rule.remediation.clone(),
                    file: virtual_path.to_string(),
                    line: Some(line),
                    column: Some(column),
                    confidence: None,
                    match_len: Some(matched_text.len()),
                });
                emitted += 1;
                if emitted >= MAX_FINDINGS_PER_RULE {
                    break 'patterns;
                }
            }
        }
    }
    findings
}

/// Whether the byte offset in `content` falls on a comment line or inside a `/* ... */` block.
pub fn in_comment_context(content: &str, offset: usize) -> bool {
    let line_index = LineIndex::build(content);
    let (line, _) = line_index.locate(offset);
    let line_start = line_index.starts[line - 1];
    if looks_like_comment(content, line_start) {
        return true;
    }
    let before = &content[..offset.min(content.len())];
    match (before.rfind("/*"), before.rfind("*/")) {
        (Some(_), None) => true,
        (Some(open), Some(close)) => open > close,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RuleIndex;
    use crate::rules::compile_yaml_document;
    use crate::types::FileType;

    fn build_index(yaml: &str) -> RuleIndex {
        RuleIndex::build(compile_yaml_document("t.yml", yaml).unwrap())
    }

    #[test]
    fn emits_finding_with_line_and_column() {
        let index = build_index(
            r#"
- id: R1
  category: test
  severity: HIGH
  patterns: ["secret"]
  file_types: ["any"]
"#,
        );
        let content = "line one\nthe secret is here\n";
        let findings = match_content(content, "f.py", FileType::Python, &index);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, Some(2));
    }

    #[test]
    fn caps_at_twenty_per_rule() {
        let index = build_index(
            r#"
- id: R1
  category: test
  severity: HIGH
  patterns: ["needle"]
  file_types: ["any"]
"#,
        );
        let content = "needle ".repeat(25);
        let findings = match_content(&content, "f.py", FileType::Python, &index);
        assert_eq!(findings.len(), 20);
    }

    #[test]
    fn exclude_pattern_suppresses_match() {
        let index = build_index(
            r#"
- id: R1
  category: test
  severity: HIGH
  patterns: ["password\\s*=\\s*\\S+"]
  file_types: ["any"]
  exclude_patterns: ["password\\s*=\\s*(os\\.getenv|process\\.env)"]
"#,
        );
        let content = r#"password = os.getenv("PW")"#;
        let findings = match_content(content, "f.py", FileType::Python, &index);
        assert!(findings.is_empty());
    }

    #[test]
    fn zero_width_match_does_not_loop() {
        let index = build_index(
            r#"
- id: R1
  category: test
  severity: LOW
  patterns: ["x*"]
  file_types: ["any"]
"#,
        );
        let findings = match_content("abc", "f.py", FileType::Python, &index);
        assert!(findings.is_empty());
    }

    #[test]
    fn empty_content_yields_no_findings() {
        let index = build_index(
            r#"
- id: R1
  category: test
  severity: LOW
  patterns: ["anything"]
  file_types: ["any"]
"#,
        );
        let findings = match_content("", "f.py", FileType::Python, &index);
        assert!(findings.is_empty());
    }
}
