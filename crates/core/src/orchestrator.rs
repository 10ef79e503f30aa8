//! Scan Orchestrator (§4.10): the top-level driver. Compiles the rule corpus once,
//! builds a `ContentPlan` per target, runs the scheduler, and applies the meta-filter
//! — emitting typed progress events along the way rather than holding a reference to
//! any external consumer (teacher's channel-over-callback convention, per `watch.rs`).

use crate::cache::ScanCache;
use crate::content;
use crate::engine::RuleIndex;
use crate::error::ScanError;
use crate::mcp;
use crate::meta;
use crate::rules;
use crate::scheduler;
use crate::types::{ContentItem, ProgressEvent, ScanOptions, ScanResult, Target, TargetKind};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use std::time::Instant;

/// The single point of contact between the orchestrator and an external consumer
/// (a CLI progress bar, a future TUI, or nothing at all in library/test use). `Sync` so
/// the scheduler's rayon workers can report `FileScanned`/`FindingsBatch` through a shared
/// reference as each item finishes, rather than batching events through a side channel.
pub trait ProgressSink: Sync {
    fn send(&self, event: ProgressEvent);
}

impl ProgressSink for Sender<ProgressEvent> {
    fn send(&self, event: ProgressEvent) {
        let _ = Sender::send(self, event);
    }
}

/// A sink that discards every event — the default for library callers that don't
/// need progress reporting.
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn send(&self, _event: ProgressEvent) {}
}

/// Compiled rule corpus plus the cache, constructed once at startup and threaded
/// explicitly through every scan rather than held as ambient global state (§9).
pub struct Engine {
    rule_index: RuleIndex,
    rule_version: String,
    cache: Option<ScanCache>,
    cache_path: Option<std::path::PathBuf>,
}

impl Engine {
    /// Compile every rule file found in `rule_dirs` into one corpus.
    pub fn new(rule_dirs: &[std::path::PathBuf], options: &ScanOptions) -> Result<Self, ScanError> {
        let mut corpus = Vec::new();
        for dir in rule_dirs {
            corpus.extend(rules::compile_directory(dir)?);
        }
        let rule_version = rules::rule_version(&corpus);
        tracing::info!(rules = corpus.len(), rule_version = %rule_version, "compiled rule corpus");

        let cache_path = if options.use_cache {
            options
                .cache_path
                .clone()
                .or_else(crate::cache::default_cache_path)
        } else {
            None
        };
        let cache = if options.use_cache {
            Some(match &cache_path {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "loading scan cache");
                    ScanCache::load(path, options.cache_ttl_secs)
                }
                None => ScanCache::new(options.cache_ttl_secs),
            })
        } else {
            None
        };

        Ok(Self {
            rule_index: RuleIndex::build(corpus),
            rule_version,
            cache,
            cache_path,
        })
    }

    pub fn rule_version(&self) -> &str {
        &self.rule_version
    }

    pub fn rule_count(&self) -> usize {
        self.rule_index.rules().len()
    }

    /// Run one scan across every target, applying the meta-filter cross-target at the end.
    pub fn scan(
        &self,
        targets: &[Target],
        options: &ScanOptions,
        progress: &dyn ProgressSink,
    ) -> ScanResult {
        let cancel = AtomicBool::new(false);
        self.scan_with_cancel(targets, options, progress, &cancel)
    }

    pub fn scan_with_cancel(
        &self,
        targets: &[Target],
        options: &ScanOptions,
        progress: &dyn ProgressSink,
        cancel: &AtomicBool,
    ) -> ScanResult {
        let start = Instant::now();
        let mut plans = Vec::with_capacity(targets.len());
        for target in targets {
            plans.push((target.clone(), build_plan(target, options)));
        }
        let total_items: usize = plans.iter().map(|(_, items)| items.len()).sum();
        progress.send(ProgressEvent::Start { total_items });
        tracing::info!(targets = targets.len(), total_items, "scan starting");

        let mut all_findings = Vec::new();
        let mut contents_by_file = HashMap::new();
        let mut scanned_files = 0usize;

        for (target, items) in plans {
            progress.send(ProgressEvent::BeginTarget {
                target: target.clone(),
                items: items.len(),
            });
            tracing::info!(target = %target.name, items = items.len(), "scanning target");

            for item in &items {
                contents_by_file.insert(item.virtual_path.clone(), item.content.clone());
            }
            scanned_files += items.len();

            let findings = scheduler::scan_items(
                items,
                &self.rule_index,
                &self.rule_version,
                self.cache.as_ref(),
                options.use_behavioral,
                options.max_workers,
                cancel,
                progress,
            );
            let findings = meta::dedupe(findings);

            progress.send(ProgressEvent::CompleteTarget {
                target: target.clone(),
                findings: findings.len(),
            });
            all_findings.extend(findings);

            if cancel.load(std::sync::atomic::Ordering::Relaxed) {
                break;
            }
        }

        let mut findings = meta::dedupe(all_findings);
        if options.score_confidence {
            findings = meta::apply_confidence(findings, &contents_by_file, options.min_confidence);
        } else if let Some(threshold) = options.min_confidence {
            findings.retain(|f| f.confidence.unwrap_or(1.0) >= threshold);
        }

        if let Some(cache) = &self.cache {
            if let Some(path) = &self.cache_path {
                if let Err(err) = cache.flush(path) {
                    tracing::warn!(error = %err, "failed to flush scan cache");
                }
            }
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        progress.send(ProgressEvent::Finish {
            findings: findings.len(),
            scanned_files,
            elapsed_ms,
        });
        tracing::info!(
            findings = findings.len(),
            scanned_files,
            elapsed_ms,
            "scan finished"
        );

        ScanResult {
            targets: targets.to_vec(),
            findings,
            scanned_files,
            elapsed_ms,
        }
    }
}

/// Build one target's `ContentPlan`: the set of `ContentItem`s it contributes.
fn build_plan(target: &Target, options: &ScanOptions) -> Vec<ContentItem> {
    match target.kind {
        TargetKind::Mcp => build_mcp_plan(target, options),
        _ => build_filesystem_plan(Path::new(&target.path)),
    }
}

fn build_filesystem_plan(root: &Path) -> Vec<ContentItem> {
    if root.is_file() {
        let virtual_path = root.to_string_lossy().to_string();
        return content::load_file(root, &virtual_path)
            .into_iter()
            .collect();
    }
    let walker = ignore::WalkBuilder::new(root).hidden(false).build();
    let mut items = Vec::new();
    for entry in walker.flatten() {
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        let virtual_path = path.to_string_lossy().to_string();
        if let Some(item) = content::load_file(path, &virtual_path) {
            items.push(item);
        }
    }
    items
}

fn build_mcp_plan(target: &Target, options: &ScanOptions) -> Vec<ContentItem> {
    match mcp::collect_server(&target.path, options) {
        Ok(collected) => {
            tracing::info!(
                server = %collected.host,
                tools = collected.tool_count,
                prompts = collected.prompt_count,
                resources = collected.resource_count,
                "collected MCP server"
            );
            collected.items
        }
        Err(err) => {
            tracing::warn!(target = %target.name, error = %err, "MCP collection failed for target");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TargetKind;
    use std::io::Write;

    fn write_rule_file(dir: &Path) {
        std::fs::write(
            dir.join("rules.yml"),
            r#"
- id: SECRET
  category: secrets
  severity: HIGH
  patterns: ["secret"]
  file_types: ["any"]
"#,
        )
        .unwrap();
    }

    #[test]
    fn end_to_end_scan_over_one_file() {
        let rule_dir = tempfile::tempdir().unwrap();
        write_rule_file(rule_dir.path());

        let scan_dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(scan_dir.path().join("config.py")).unwrap();
        writeln!(f, "token = 'a secret value'").unwrap();

        let options = ScanOptions {
            use_cache: false,
            ..ScanOptions::default()
        };
        let engine = Engine::new(&[rule_dir.path().to_path_buf()], &options).unwrap();
        let target = Target::new(
            TargetKind::Path,
            "demo",
            scan_dir.path().to_string_lossy().to_string(),
        );
        let result = engine.scan(&[target], &options, &NoopProgressSink);

        assert_eq!(result.scanned_files, 1);
        assert!(result.findings.iter().any(|f| f.rule_id == "SECRET"));
        assert!(result.findings[0].confidence.is_some());
    }

    #[test]
    fn no_targets_yields_empty_result() {
        let rule_dir = tempfile::tempdir().unwrap();
        write_rule_file(rule_dir.path());
        let options = ScanOptions {
            use_cache: false,
            ..ScanOptions::default()
        };
        let engine = Engine::new(&[rule_dir.path().to_path_buf()], &options).unwrap();
        let result = engine.scan(&[], &options, &NoopProgressSink);
        assert_eq!(result.findings.len(), 0);
        assert_eq!(result.scanned_files, 0);
    }
}
