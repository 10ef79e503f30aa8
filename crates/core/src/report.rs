//! Report renderers (§6, §4.13): JSON and SARIF 2.1.0 views over a [`ScanResult`],
//! matching the teacher's serde-first JSON style (build a `serde_json::Value`, let
//! `serde_json` own formatting) rather than hand-rolled string templating.

use crate::types::{Finding, ScanResult, Severity};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// `{summary, detected, targets, findings}` per §6. The optional `detected.mcp` section
/// is omitted: `ScanResult` (§3) carries only targets and findings, not raw MCP
/// collection counters, so there is nothing faithful to report there without widening
/// the core data model (see DESIGN.md).
pub fn render_json(result: &ScanResult) -> Value {
    let mut severities: BTreeMap<&'static str, usize> =
        [("LOW", 0), ("MEDIUM", 0), ("HIGH", 0), ("CRITICAL", 0)]
            .into_iter()
            .collect();
    for finding in &result.findings {
        *severities.entry(finding.severity.as_str()).or_insert(0) += 1;
    }

    let mut target_kinds: BTreeMap<&'static str, usize> = BTreeMap::new();
    for target in &result.targets {
        *target_kinds.entry(target.kind.as_str()).or_insert(0) += 1;
    }

    let mut sources: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut rule_counts: BTreeMap<(String, &'static str, Option<String>, &'static str), usize> =
        BTreeMap::new();
    let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
    for finding in &result.findings {
        *sources.entry(finding.source.as_str()).or_insert(0) += 1;
        let key = (
            finding.rule_id.clone(),
            finding.severity.as_str(),
            finding.category.clone(),
            finding.source.as_str(),
        );
        *rule_counts.entry(key).or_insert(0) += 1;
        if let Some(category) = &finding.category {
            *category_counts.entry(category.clone()).or_insert(0) += 1;
        }
    }

    let rules: Vec<Value> = rule_counts
        .into_iter()
        .map(|((rule_id, severity, category, source), count)| {
            json!({
                "rule_id": rule_id,
                "severity": severity,
                "category": category,
                "source": source,
                "count": count,
            })
        })
        .collect();

    let categories: Vec<Value> = category_counts
        .into_iter()
        .map(|(category, count)| json!({ "category": category, "count": count }))
        .collect();

    json!({
        "summary": {
            "scanned_files": result.scanned_files,
            "elapsed_ms": result.elapsed_ms,
            "finding_count": result.findings.len(),
            "severities": severities,
        },
        "detected": {
            "target_kinds": target_kinds,
            "sources": sources,
            "rules": rules,
            "categories": categories,
        },
        "targets": result.targets,
        "findings": result.findings,
    })
}

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "note",
        Severity::Medium => "warning",
        Severity::High => "error",
        Severity::Critical => "error",
    }
}

fn sarif_result(finding: &Finding) -> Value {
    json!({
        "ruleId": finding.rule_id,
        "level": sarif_level(finding.severity),
        "message": { "text": finding.message },
        "locations": [{
            "physicalLocation": {
                "artifactLocation": { "uri": finding.file },
                "region": { "startLine": finding.line.unwrap_or(1) },
            }
        }],
    })
}

/// SARIF 2.1.0: one `result` per finding, under a single `skillscan` driver run.
pub fn render_sarif(result: &ScanResult) -> Value {
    let mut rule_ids: Vec<&str> = result.findings.iter().map(|f| f.rule_id.as_str()).collect();
    rule_ids.sort_unstable();
    rule_ids.dedup();
    let rules: Vec<Value> = rule_ids.iter().map(|id| json!({ "id": id })).collect();

    json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "skillscan",
                    "version": env!("CARGO_PKG_VERSION"),
                    "rules": rules,
                }
            },
            "results": result.findings.iter().map(sarif_result).collect::<Vec<_>>(),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Source, Target, TargetKind};

    fn sample_result() -> ScanResult {
        ScanResult {
            targets: vec![Target::new(TargetKind::Path, "demo", "/tmp/demo")],
            findings: vec![Finding {
                rule_id: "R1".into(),
                severity: Severity::High,
                category: Some("secrets".into()),
                source: Source::Signature,
                message: "found a secret".into(),
                remediation: None,
                file: "/tmp/demo/a.py".into(),
                line: Some(3),
                column: Some(1),
                confidence: Some(0.8),
                match_len: None,
            }],
            scanned_files: 1,
            elapsed_ms: 10,
        }
    }

    #[test]
    fn json_report_has_expected_shape() {
        let value = render_json(&sample_result());
        assert_eq!(value["summary"]["finding_count"], 1);
        assert_eq!(value["summary"]["severities"]["HIGH"], 1);
        assert_eq!(value["detected"]["rules"][0]["rule_id"], "R1");
        assert_eq!(value["findings"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn json_report_round_trips_findings_and_targets() {
        let result = sample_result();
        let value = render_json(&result);
        let findings: Vec<Finding> = serde_json::from_value(value["findings"].clone()).unwrap();
        assert_eq!(findings, result.findings);
        let targets: Vec<Target> = serde_json::from_value(value["targets"].clone()).unwrap();
        assert_eq!(targets.len(), result.targets.len());
    }

    #[test]
    fn sarif_report_has_one_result_per_finding() {
        let value = render_sarif(&sample_result());
        let results = value["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["ruleId"], "R1");
        assert_eq!(
            results[0]["locations"][0]["physicalLocation"]["region"]["startLine"],
            3
        );
    }

    #[test]
    fn sarif_level_maps_critical_to_error() {
        assert_eq!(sarif_level(Severity::Critical), "error");
        assert_eq!(sarif_level(Severity::Low), "note");
    }
}
