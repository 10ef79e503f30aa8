//! Extension-Manifest Analyzer (§4.4.3): browser/IDE extension manifest risk checks.

use crate::types::{Finding, Severity, Source};

const SENSITIVE_PERMISSIONS: &[&str] = &[
    "nativeMessaging",
    "debugger",
    "proxy",
    "webRequestBlocking",
    "management",
];

fn is_broad_host_pattern(pattern: &str) -> bool {
    pattern == "<all_urls>" || pattern == "*://*/*"
}

/// Byte offset of `key`'s first appearance in the raw JSON text, for approximate line/column.
fn locate_key(content: &str, key: &str) -> Option<usize> {
    let needle = format!("\"{key}\"");
    content.find(&needle)
}

fn line_col_at(content: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for c in content[..offset.min(content.len())].chars() {
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn finding(
    content: &str,
    virtual_path: &str,
    rule_id: &str,
    severity: Severity,
    message: String,
    key_hint: &str,
) -> Finding {
    let (line, column) = match locate_key(content, key_hint) {
        Some(offset) => {
            let (l, c) = line_col_at(content, offset);
            (Some(l), Some(c))
        }
        None => (None, None),
    };
    Finding {
        rule_id: rule_id.to_string(),
        severity,
        category: Some("extension-manifest".to_string()),
        source: Source::Heuristic,
        message,
        remediation: Some(
            "Scope permissions and content-security-policy as narrowly as possible.".to_string(),
        ),
        file: virtual_path.to_string(),
        line,
        column,
        confidence: None,
        match_len: None,
    }
}

/// Activated when `virtual_path` basename is `manifest.json`.
pub fn analyze(content: &str, virtual_path: &str) -> Vec<Finding> {
    let basename = virtual_path.rsplit('/').next().unwrap_or(virtual_path);
    if basename != "manifest.json" {
        return Vec::new();
    }
    let value: serde_json::Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let mut findings = Vec::new();

    let host_permissions: Vec<String> = value
        .get("host_permissions")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let legacy_permissions: Vec<String> = value
        .get("permissions")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    if host_permissions
        .iter()
        .chain(legacy_permissions.iter())
        .any(|p| is_broad_host_pattern(p))
    {
        findings.push(finding(
            content,
            virtual_path,
            "MANIFEST_BROAD_HOST_PERMISSION",
            Severity::High,
            "manifest requests access to all URLs".to_string(),
            "host_permissions",
        ));
    }

    for permission in legacy_permissions.iter().chain(host_permissions.iter()) {
        if SENSITIVE_PERMISSIONS.contains(&permission.as_str()) {
            findings.push(finding(
                content,
                virtual_path,
                "MANIFEST_DANGEROUS_PERMISSION",
                Severity::Medium,
                format!("manifest declares sensitive permission `{permission}`"),
                "permissions",
            ));
        }
    }

    let csp_text: Option<String> = value.get("content_security_policy").and_then(|v| {
        v.as_str().map(str::to_string).or_else(|| {
            v.get("extension_pages")
                .and_then(|p| p.as_str())
                .map(str::to_string)
        })
    });
    if let Some(csp) = csp_text {
        if let Some(script_src_idx) = csp.find("script-src") {
            let directive = &csp[script_src_idx..];
            let sources: &str = directive.split(';').next().unwrap_or(directive);
            let remote = sources
                .split_whitespace()
                .skip(1)
                .any(|src| src != "'self'" && src != "'none'");
            if remote {
                findings.push(finding(
                    content,
                    virtual_path,
                    "MANIFEST_REMOTE_CODE_SOURCE",
                    Severity::High,
                    "content_security_policy permits script-src from a remote origin".to_string(),
                    "content_security_policy",
                ));
            }
        }
    }

    let has_background = value.get("background").is_some();
    if has_background && host_permissions.is_empty() {
        findings.push(finding(
            content,
            virtual_path,
            "MANIFEST_UNDECLARED_NETWORK",
            Severity::Low,
            "background/service_worker declared with no host_permissions".to_string(),
            "background",
        ));
    }

    findings
}
