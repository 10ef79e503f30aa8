//! Scheduler (§4.7): parallel worker pool over a target's `ContentItem`s, consulting the
//! cache, running the matcher + heuristics, and emitting progress events.

use crate::cache::ScanCache;
use crate::engine::RuleIndex;
use crate::heuristics;
use crate::matcher;
use crate::orchestrator::ProgressSink;
use crate::types::{ContentItem, Finding, ProgressEvent};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scan one target's items across a bounded rayon thread pool.
///
/// `cancel` is polled between items; once set, no new items are started but in-flight
/// items still complete and their findings are still collected (§4.7, §5). Each worker
/// reports `FileScanned`/`FindingsBatch` through `progress` as soon as its item finishes,
/// so a live consumer sees per-file events interleaved with the scan, not batched at the end.
#[allow(clippy::too_many_arguments)]
pub fn scan_items(
    items: Vec<ContentItem>,
    rule_index: &RuleIndex,
    rule_version: &str,
    cache: Option<&ScanCache>,
    use_behavioral: bool,
    max_workers: Option<usize>,
    cancel: &AtomicBool,
    progress: &dyn ProgressSink,
) -> Vec<Finding> {
    let index = AtomicUsize::new(0);
    let findings = Mutex::new(Vec::new());
    let worker_count = max_workers.unwrap_or_else(crate::types::default_worker_count);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count.min(rayon::current_num_threads().max(worker_count)))
        .build()
        .unwrap_or_else(|_| {
            rayon::ThreadPoolBuilder::new()
                .build()
                .expect("default rayon pool")
        });

    pool.install(|| {
        (0..items.len()).into_par_iter().for_each(|_| {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            let i = index.fetch_add(1, Ordering::SeqCst);
            let Some(item) = items.get(i) else { return };

            let item_findings = scan_one(item, rule_index, rule_version, cache, use_behavioral);

            progress.send(ProgressEvent::FileScanned {
                virtual_path: item.virtual_path.clone(),
            });
            if !item_findings.is_empty() {
                progress.send(ProgressEvent::FindingsBatch {
                    count: item_findings.len(),
                });
            }
            findings.lock().unwrap().extend(item_findings);
        });
    });

    findings.into_inner().unwrap()
}

fn scan_one(
    item: &ContentItem,
    rule_index: &RuleIndex,
    rule_version: &str,
    cache: Option<&ScanCache>,
    use_behavioral: bool,
) -> Vec<Finding> {
    if let Some(cache) = cache {
        if let Some(hit) = cache.lookup(&item.virtual_path, rule_version, &item.content) {
            return hit;
        }
    }

    let mut findings = matcher::match_content(
        &item.content,
        &item.virtual_path,
        item.file_type,
        rule_index,
    );
    if use_behavioral {
        findings.extend(heuristics::analyze(item));
    }

    if let Some(cache) = cache {
        cache.store(
            &item.virtual_path,
            rule_version,
            &item.content,
            findings.clone(),
        );
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::compile_yaml_document;
    use crate::types::FileType;
    use std::sync::atomic::AtomicBool;
    use std::sync::mpsc;

    #[test]
    fn scans_items_and_emits_progress() {
        let rules = compile_yaml_document(
            "t.yml",
            r#"
- id: R1
  category: test
  severity: HIGH
  patterns: ["secret"]
  file_types: ["any"]
"#,
        )
        .unwrap();
        let index = RuleIndex::build(rules);
        let items = vec![
            ContentItem::new("a.py", FileType::Python, "no match here"),
            ContentItem::new("b.py", FileType::Python, "a secret value"),
        ];
        let cancel = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel();
        let findings = scan_items(items, &index, "v1", None, false, None, &cancel, &tx);
        assert_eq!(findings.len(), 1);
        drop(tx);
        let events: Vec<_> = rx.try_iter().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::FileScanned { .. })));
    }

    #[test]
    fn cache_avoids_rematch_on_second_pass() {
        let rules = compile_yaml_document(
            "t.yml",
            r#"
- id: R1
  category: test
  severity: HIGH
  patterns: ["secret"]
  file_types: ["any"]
"#,
        )
        .unwrap();
        let index = RuleIndex::build(rules);
        let cache = ScanCache::new(crate::types::DEFAULT_CACHE_TTL_SECS);
        let cancel = AtomicBool::new(false);
        let (tx, _rx) = mpsc::channel();

        let items = vec![ContentItem::new("b.py", FileType::Python, "a secret value")];
        let first = scan_items(
            items.clone(),
            &index,
            "v1",
            Some(&cache),
            false,
            None,
            &cancel,
            &tx,
        );
        let second = scan_items(items, &index, "v1", Some(&cache), false, None, &cancel, &tx);
        assert_eq!(first, second);
    }
}
