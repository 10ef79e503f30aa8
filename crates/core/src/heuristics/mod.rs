//! Heuristic analyzers: non-rule-based detectors embedded in code (§4.4).
//! All findings from this module carry `source = Source::Heuristic`.

pub mod code;
pub mod entropy;
pub mod manifest;
pub mod supply_chain;

use crate::types::{ContentItem, Finding};

/// Run every applicable heuristic against one content item.
pub fn analyze(item: &ContentItem) -> Vec<Finding> {
    let mut findings = entropy::analyze(&item.content, &item.virtual_path);
    findings.extend(supply_chain::analyze(&item.content, &item.virtual_path));
    findings.extend(manifest::analyze(&item.content, &item.virtual_path));
    findings.extend(code::analyze(
        &item.content,
        &item.virtual_path,
        item.file_type,
    ));
    findings
}
