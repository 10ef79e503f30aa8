//! Rule corpus compilation: YAML rule files -> `Vec<CompiledRule>` plus a content digest
//! (`rule_version`) used by the cache to invalidate on any corpus change.

use crate::error::RuleError;
use crate::types::{CompiledRule, RawRule, Severity};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Strip every `(?i)` token from `pattern`, returning the cleaned source and whether any was found.
fn normalize_inline_case_flag(pattern: &str) -> (String, bool) {
    if !pattern.contains("(?i)") {
        return (pattern.to_string(), false);
    }
    (pattern.replace("(?i)", ""), true)
}

fn compile_pattern(
    id: &str,
    index: usize,
    source: &str,
) -> Result<(regex::Regex, String), RuleError> {
    let (cleaned, case_insensitive) = normalize_inline_case_flag(source);
    let built = regex::RegexBuilder::new(&cleaned)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|source| RuleError::PatternCompile {
            id: id.to_string(),
            index,
            source,
        })?;
    Ok((built, cleaned))
}

/// Compile one raw rule record. Returns `Ok(None)` for a rule with required fields missing
/// (diagnostic already logged) rather than an error, matching §4.1's "skipped silently" contract.
fn compile_one(raw: RawRule) -> Result<Option<CompiledRule>, RuleError> {
    let id = match raw.id {
        Some(id) if !id.is_empty() => id,
        _ => {
            tracing::warn!("rule missing `id`; skipping");
            return Ok(None);
        }
    };
    let category = match raw.category {
        Some(c) => c,
        None => {
            tracing::warn!(rule_id = %id, "rule missing `category`; skipping");
            return Ok(None);
        }
    };
    let severity = match raw.severity.as_deref().and_then(Severity::parse) {
        Some(s) => s,
        None => {
            tracing::warn!(rule_id = %id, "rule missing or invalid `severity`; skipping");
            return Ok(None);
        }
    };
    let raw_patterns = match raw.patterns {
        Some(p) if !p.is_empty() => p,
        _ => {
            tracing::warn!(rule_id = %id, "rule has no patterns; skipping");
            return Ok(None);
        }
    };
    let file_types = match raw.file_types {
        Some(ft) if !ft.is_empty() => ft,
        _ => {
            tracing::warn!(rule_id = %id, "rule missing `file_types`; skipping");
            return Ok(None);
        }
    };

    let mut patterns = Vec::new();
    let mut pattern_sources = Vec::new();
    for (index, source) in raw_patterns.iter().enumerate() {
        match compile_pattern(&id, index, source) {
            Ok((compiled, cleaned)) => {
                patterns.push(compiled);
                pattern_sources.push(cleaned);
            }
            Err(err) => {
                tracing::warn!(rule_id = %id, pattern_index = index, error = %err, "dropping invalid pattern");
            }
        }
    }
    if patterns.is_empty() {
        tracing::warn!(rule_id = %id, "all patterns failed to compile; skipping rule");
        return Ok(None);
    }

    let mut exclude_patterns = Vec::new();
    for (index, source) in raw.exclude_patterns.unwrap_or_default().iter().enumerate() {
        match compile_pattern(&id, index, source) {
            Ok((compiled, _)) => exclude_patterns.push(compiled),
            Err(err) => {
                tracing::warn!(rule_id = %id, error = %err, "dropping invalid exclude_pattern");
            }
        }
    }

    let applies_to_any = file_types.iter().any(|t| t == "any");

    Ok(Some(CompiledRule {
        id,
        category,
        severity,
        patterns,
        pattern_sources,
        file_types,
        applies_to_any,
        description: raw.description,
        remediation: raw.remediation,
        exclude_patterns,
    }))
}

/// Parse and compile one YAML rule file's contents.
pub fn compile_yaml_document(path: &str, yaml: &str) -> Result<Vec<CompiledRule>, RuleError> {
    let raw_rules: Vec<RawRule> = serde_yaml::from_str(yaml).map_err(|source| RuleError::Yaml {
        path: path.to_string(),
        source,
    })?;
    let mut compiled = Vec::with_capacity(raw_rules.len());
    for raw in raw_rules {
        if let Some(rule) = compile_one(raw)? {
            compiled.push(rule);
        }
    }
    Ok(compiled)
}

/// Walk `dir` for `*.yml`/`*.yaml` rule files and compile them all into one corpus.
pub fn compile_directory(dir: &Path) -> Result<Vec<CompiledRule>, RuleError> {
    let mut corpus = Vec::new();
    if !dir.exists() {
        return Ok(corpus);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"))
            .unwrap_or(false);
        if !is_yaml {
            continue;
        }
        let contents = std::fs::read_to_string(&path)?;
        let path_str = path.display().to_string();
        corpus.extend(compile_yaml_document(&path_str, &contents)?);
    }
    Ok(corpus)
}

/// SHA-256 digest over every surviving rule's id, patterns, file_types, and severity.
pub fn rule_version(corpus: &[CompiledRule]) -> String {
    let mut hasher = Sha256::new();
    for rule in corpus {
        hasher.update(rule.id.as_bytes());
        for pattern in &rule.pattern_sources {
            hasher.update(pattern.as_bytes());
        }
        for ft in &rule.file_types {
            hasher.update(ft.as_bytes());
        }
        hasher.update(rule.severity.as_str().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
