//! Result Store (§4.13, §6): a small file-backed JSON result store — newest-first, with
//! a retention ceiling — plus fingerprint-based diffing between two stored scans.
//!
//! This stands in for the full SQLite persistence schema named in §1 as external: the
//! minimal persistence contract the diff feature needs, not that schema.

use crate::types::{Finding, ScanResult, Severity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredScan {
    pub id: String,
    pub created_at_ms: u64,
    pub result: ScanResult,
}

pub struct ResultStore {
    path: PathBuf,
    scans: Vec<StoredScan>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl ResultStore {
    /// Load the store from `path`. A missing or corrupt file starts empty (same
    /// soft-failure policy as the scan cache — history is not worth crashing over).
    pub fn load(path: &Path) -> Self {
        let scans = std::fs::read_to_string(path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            scans,
        }
    }

    /// Persist `result` as a new scan, generated-id'd by millisecond timestamp plus a
    /// random suffix (§6), then prune down to `retention` newest entries.
    pub fn save(&mut self, result: ScanResult, retention: usize) -> std::io::Result<String> {
        let created_at_ms = now_ms();
        let id = format!("{created_at_ms}-{}", uuid::Uuid::new_v4().simple());
        self.scans.insert(
            0,
            StoredScan {
                id: id.clone(),
                created_at_ms,
                result,
            },
        );
        self.scans.truncate(retention.max(1));
        self.flush()?;
        Ok(id)
    }

    pub fn list(&self) -> &[StoredScan] {
        &self.scans
    }

    pub fn get(&self, id: &str) -> Option<&StoredScan> {
        self.scans.iter().find(|s| s.id == id)
    }

    fn flush(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&self.scans)?;
        std::fs::write(&self.path, json)
    }
}

/// Result of comparing a baseline scan against a current one, partitioned by
/// fingerprint (§4.8, §6).
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffReport {
    pub added: Vec<Finding>,
    pub removed: Vec<Finding>,
    pub unchanged: Vec<Finding>,
    pub severity_changed: Vec<(Finding, Finding)>,
}

/// A fingerprint that ignores severity, so a rule firing on the same spot with a
/// different severity shows up as `severity_changed` rather than add+remove.
fn loose_fingerprint(f: &Finding) -> (String, String, String, String) {
    (
        f.rule_id.clone(),
        f.file.clone(),
        f.line.map(|l| l.to_string()).unwrap_or_default(),
        f.message.clone(),
    )
}

pub fn diff(baseline: &ScanResult, current: &ScanResult) -> DiffReport {
    use std::collections::HashMap;

    let baseline_index: HashMap<_, _> = baseline
        .findings
        .iter()
        .map(|f| (loose_fingerprint(f), f))
        .collect();
    let mut current_index: HashMap<_, _> = current
        .findings
        .iter()
        .map(|f| (loose_fingerprint(f), f))
        .collect();

    let mut report = DiffReport::default();
    for (fp, base_finding) in &baseline_index {
        match current_index.remove(fp) {
            Some(cur_finding) if cur_finding.severity == base_finding.severity => {
                report.unchanged.push((*cur_finding).clone());
            }
            Some(cur_finding) => {
                report
                    .severity_changed
                    .push(((*base_finding).clone(), (*cur_finding).clone()));
            }
            None => {
                report.removed.push((*base_finding).clone());
            }
        }
    }
    report.added.extend(current_index.into_values().cloned());
    report
}

/// Whether any finding in `findings` meets or exceeds `floor` — the CLI's
/// `--fail-on` severity gate, exit code 2 per §6.
pub fn any_meets_severity(findings: &[Finding], floor: Severity) -> bool {
    findings.iter().any(|f| f.severity >= floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Source, Target, TargetKind};

    fn finding(rule_id: &str, severity: Severity) -> Finding {
        Finding {
            rule_id: rule_id.into(),
            severity,
            category: None,
            source: Source::Signature,
            message: "m".into(),
            remediation: None,
            file: "a.py".into(),
            line: Some(1),
            column: None,
            confidence: None,
            match_len: None,
        }
    }

    fn result(findings: Vec<Finding>) -> ScanResult {
        ScanResult {
            targets: vec![Target::new(TargetKind::Path, "t", "/tmp")],
            findings,
            scanned_files: 1,
            elapsed_ms: 1,
        }
    }

    #[test]
    fn save_and_retrieve_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ResultStore::load(&dir.path().join("history.json"));
        let id = store
            .save(result(vec![finding("R1", Severity::High)]), 10)
            .unwrap();
        let reloaded = ResultStore::load(&dir.path().join("history.json"));
        assert_eq!(reloaded.list().len(), 1);
        assert_eq!(reloaded.get(&id).unwrap().id, id);
    }

    #[test]
    fn retention_ceiling_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ResultStore::load(&dir.path().join("history.json"));
        for i in 0..5 {
            store
                .save(result(vec![finding(&format!("R{i}"), Severity::Low)]), 3)
                .unwrap();
        }
        assert_eq!(store.list().len(), 3);
    }

    #[test]
    fn diff_partitions_added_removed_unchanged() {
        let baseline = result(vec![
            finding("R1", Severity::High),
            finding("R2", Severity::Low),
        ]);
        let current = result(vec![
            finding("R1", Severity::High),
            finding("R3", Severity::Medium),
        ]);
        let report = diff(&baseline, &current);
        assert_eq!(report.unchanged.len(), 1);
        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.removed[0].rule_id, "R2");
        assert_eq!(report.added[0].rule_id, "R3");
    }

    #[test]
    fn diff_detects_severity_change() {
        let baseline = result(vec![finding("R1", Severity::Low)]);
        let current = result(vec![finding("R1", Severity::Critical)]);
        let report = diff(&baseline, &current);
        assert_eq!(report.severity_changed.len(), 1);
        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());
    }

    #[test]
    fn fail_on_severity_gate() {
        let findings = vec![finding("R1", Severity::Medium)];
        assert!(any_meets_severity(&findings, Severity::Medium));
        assert!(!any_meets_severity(&findings, Severity::High));
    }
}
