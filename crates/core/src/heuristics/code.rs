//! Code Analyzer (§4.4.4): cross-cutting dynamic-eval / dynamic-load / shell-concat detectors,
//! independent of the YAML rule corpus.

use crate::types::{FileType, Finding, Severity, Source};
use regex::Regex;
use std::sync::OnceLock;

struct Detector {
    rule_id: &'static str,
    severity: Severity,
    message: &'static str,
    pattern: fn() -> &'static Regex,
}

macro_rules! lazy_regex {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pat).unwrap())
        }
    };
}

lazy_regex!(eval_js, r"\beval\s*\(|\bnew\s+Function\s*\(");
lazy_regex!(eval_py, r"\b(exec|eval)\s*\(");
lazy_regex!(eval_bash, r"(^|\n)\s*eval\s+");
lazy_regex!(
    dynload_js,
    r#"\brequire\s*\(\s*[^'")\s]|\bimport\s*\(\s*[^'")\s]"#
);
lazy_regex!(
    dynload_py,
    r#"importlib\.import_module\s*\(\s*(f['"]|[^'")\s])|__import__\s*\("#
);
lazy_regex!(
    shellcat_js,
    r"child_process\.exec\s*\([^)]*\+|`[^`]*\$\{[^}]*\}[^`]*`.*exec"
);
lazy_regex!(
    shellcat_py,
    r"(subprocess\.[A-Za-z_]+|os\.system)\s*\([^)]*\+"
);

fn detectors_for(file_type: FileType) -> Vec<Detector> {
    match file_type {
        FileType::Javascript | FileType::Typescript => vec![
            Detector {
                rule_id: "HEURISTIC_DYNAMIC_EVAL",
                severity: Severity::High,
                message: "dynamic code evaluation via eval()/new Function()",
                pattern: eval_js,
            },
            Detector {
                rule_id: "HEURISTIC_DYNAMIC_CODE_LOAD",
                severity: Severity::Medium,
                message: "dynamic module load with a non-literal specifier",
                pattern: dynload_js,
            },
            Detector {
                rule_id: "HEURISTIC_SHELL_STRING_CONCAT",
                severity: Severity::Medium,
                message: "shell command built by string concatenation",
                pattern: shellcat_js,
            },
        ],
        FileType::Python => vec![
            Detector {
                rule_id: "HEURISTIC_DYNAMIC_EVAL",
                severity: Severity::High,
                message: "dynamic code evaluation via exec()/eval()",
                pattern: eval_py,
            },
            Detector {
                rule_id: "HEURISTIC_DYNAMIC_CODE_LOAD",
                severity: Severity::Medium,
                message: "dynamic module import with a computed name",
                pattern: dynload_py,
            },
            Detector {
                rule_id: "HEURISTIC_SHELL_STRING_CONCAT",
                severity: Severity::Medium,
                message: "shell command built by string concatenation",
                pattern: shellcat_py,
            },
        ],
        FileType::Bash => vec![Detector {
            rule_id: "HEURISTIC_DYNAMIC_EVAL",
            severity: Severity::High,
            message: "dynamic code evaluation via eval",
            pattern: eval_bash,
        }],
        _ => Vec::new(),
    }
}

pub fn analyze(content: &str, virtual_path: &str, file_type: FileType) -> Vec<Finding> {
    let detectors = detectors_for(file_type);
    if detectors.is_empty() {
        return Vec::new();
    }
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
    for detector in detectors {
        let re = (detector.pattern)();
        if let Some(m) = re.find(content) {
            findings.push(Finding {
                rule_id: detector.rule_id.to_string(),
                severity: detector.severity,
                category: Some("code-smell".to_string()),
                source: Source::Heuristic,
                message: detector.message.to_string(),
                remediation: Some("Avoid dynamic code execution from untrusted input.".to_string()),
                file: virtual_path.to_string(),
                line: Some(locate(m.start())),
                column: None,
                confidence: None,
                match_len: Some(m.as_str().len()),
            });
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_js_eval() {
        let findings = analyze("const x = eval(userInput);", "app.js", FileType::Javascript);
        assert!(findings
            .iter()
            .any(|f| f.rule_id == "HEURISTIC_DYNAMIC_EVAL"));
    }

    #[test]
    fn detects_python_exec() {
        let findings = analyze("exec(payload)", "f.py", FileType::Python);
        assert!(findings
            .iter()
            .any(|f| f.rule_id == "HEURISTIC_DYNAMIC_EVAL"));
    }

    #[test]
    fn detects_shell_concat() {
        let findings = analyze("os.system(\"rm \" + path)", "f.py", FileType::Python);
        assert!(findings
            .iter()
            .any(|f| f.rule_id == "HEURISTIC_SHELL_STRING_CONCAT"));
    }

    #[test]
    fn no_findings_for_markdown() {
        let findings = analyze("eval(something)", "README.md", FileType::Markdown);
        assert!(findings.is_empty());
    }

    #[test]
    fn literal_require_not_flagged() {
        let findings = analyze("const fs = require('fs');", "app.js", FileType::Javascript);
        assert!(!findings
            .iter()
            .any(|f| f.rule_id == "HEURISTIC_DYNAMIC_CODE_LOAD"));
    }
}
