//! Core data model: severity, findings, content items, targets, rules, and scan options.
//!
//! Kept deliberately free of I/O — everything here is a plain value type threaded
//! explicitly through the engine (§9 "Global state" design note: no ambient singletons).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum file size (in bytes) that will be read into memory.
pub const MAX_FILE_READ: usize = 5 * 1024 * 1024;

/// Default cache entry time-to-live, in seconds (7 days).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Maximum signature findings emitted per rule, per file.
pub const MAX_FINDINGS_PER_RULE: usize = 20;

/// Maximum entropy findings emitted per file.
pub const MAX_ENTROPY_FINDINGS: usize = 10;

/// Maximum entropy candidate tokens considered per file.
pub const MAX_ENTROPY_TOKENS: usize = 2000;

/// Default per-MCP-resource byte cap.
pub const DEFAULT_MCP_RESOURCE_CAP: usize = 1024 * 1024;

/// Default per-MCP-request timeout, in seconds.
pub const DEFAULT_MCP_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Severity & source
// ---------------------------------------------------------------------------

/// Ordered finding severity: `LOW < MEDIUM < HIGH < CRITICAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Some(Severity::Low),
            "MEDIUM" => Some(Severity::Medium),
            "HIGH" => Some(Severity::High),
            "CRITICAL" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies which subsystem produced a [`Finding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Signature,
    Heuristic,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Signature => "signature",
            Source::Heuristic => "heuristic",
        }
    }
}

// ---------------------------------------------------------------------------
// File types
// ---------------------------------------------------------------------------

/// Logical content type assigned to a [`ContentItem`] by the file-type classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Markdown,
    Json,
    Manifest,
    Python,
    Typescript,
    Javascript,
    Bash,
    Binary,
    Text,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Markdown => "markdown",
            FileType::Json => "json",
            FileType::Manifest => "manifest",
            FileType::Python => "python",
            FileType::Typescript => "typescript",
            FileType::Javascript => "javascript",
            FileType::Bash => "bash",
            FileType::Binary => "binary",
            FileType::Text => "text",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Rule corpus
// ---------------------------------------------------------------------------

/// A single rule record as it appears in a YAML rule file, before compilation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRule {
    pub id: Option<String>,
    pub category: Option<String>,
    pub severity: Option<String>,
    pub patterns: Option<Vec<String>>,
    pub file_types: Option<Vec<String>>,
    pub description: Option<String>,
    pub remediation: Option<String>,
    pub exclude_patterns: Option<Vec<String>>,
}

/// A rule after pattern compilation: validated, normalized, ready to match.
#[derive(Clone)]
pub struct CompiledRule {
    pub id: String,
    pub category: String,
    pub severity: Severity,
    pub patterns: Vec<regex::Regex>,
    /// Source-form patterns (post `(?i)` normalization), used for `rule_version` hashing.
    pub pattern_sources: Vec<String>,
    pub file_types: Vec<String>,
    pub applies_to_any: bool,
    pub description: Option<String>,
    pub remediation: Option<String>,
    pub exclude_patterns: Vec<regex::Regex>,
}

impl CompiledRule {
    pub fn applies_to(&self, file_type: FileType) -> bool {
        self.applies_to_any || self.file_types.iter().any(|t| t == file_type.as_str())
    }
}

// ---------------------------------------------------------------------------
// Content items
// ---------------------------------------------------------------------------

/// The uniform scannable unit, whether it originated as a local file or a remote MCP object.
#[derive(Debug, Clone)]
pub struct ContentItem {
    pub virtual_path: String,
    pub file_type: FileType,
    pub content: String,
    pub origin_meta: HashMap<String, String>,
}

impl ContentItem {
    pub fn new(
        virtual_path: impl Into<String>,
        file_type: FileType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            virtual_path: virtual_path.into(),
            file_type,
            content: content.into(),
            origin_meta: HashMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.origin_meta.insert(key.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

/// One instance of a rule (signature or heuristic) firing against a [`ContentItem`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub rule_id: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub source: Source,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Byte length of the matched text, for confidence scoring. Not part of the wire shape.
    #[serde(skip)]
    pub match_len: Option<usize>,
}

impl Finding {
    /// De-duplication fingerprint: `(rule_id, file, line_or_empty, message)`.
    pub fn fingerprint(&self) -> (String, String, String, String) {
        (
            self.rule_id.clone(),
            self.file.clone(),
            self.line.map(|l| l.to_string()).unwrap_or_default(),
            self.message.clone(),
        )
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Skill,
    Extension,
    IdeExtension,
    Mcp,
    Path,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Skill => "skill",
            TargetKind::Extension => "extension",
            TargetKind::IdeExtension => "ide-extension",
            TargetKind::Mcp => "mcp",
            TargetKind::Path => "path",
        }
    }
}

/// An opaque producer of [`ContentItem`]s, tagged by kind for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub kind: TargetKind,
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub meta: HashMap<String, String>,
}

impl Target {
    pub fn new(kind: TargetKind, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            path: path.into(),
            meta: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scan options / result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum McpScanKind {
    Tools,
    Prompts,
    Resources,
    Instructions,
}

impl McpScanKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tools" => Some(McpScanKind::Tools),
            "prompts" => Some(McpScanKind::Prompts),
            "resources" => Some(McpScanKind::Resources),
            "instructions" => Some(McpScanKind::Instructions),
            _ => None,
        }
    }
}

/// Configuration for one engine run, threaded explicitly rather than held as ambient state.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub use_behavioral: bool,
    pub use_cache: bool,
    pub cache_path: Option<PathBuf>,
    pub cache_ttl_secs: u64,
    pub score_confidence: bool,
    pub min_confidence: Option<f64>,
    pub max_workers: Option<usize>,
    pub fix: bool,
    pub mcp_scan: Vec<McpScanKind>,
    pub mcp_read_resources: bool,
    pub mcp_resource_byte_cap: usize,
    pub mcp_allowed_mime_types: Vec<String>,
    pub mcp_timeout_secs: u64,
    pub mcp_headers: HashMap<String, String>,
    pub mcp_bearer_token: Option<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            use_behavioral: true,
            use_cache: true,
            cache_path: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            score_confidence: true,
            min_confidence: None,
            max_workers: None,
            fix: false,
            mcp_scan: vec![
                McpScanKind::Tools,
                McpScanKind::Instructions,
                McpScanKind::Prompts,
            ],
            mcp_read_resources: false,
            mcp_resource_byte_cap: DEFAULT_MCP_RESOURCE_CAP,
            mcp_allowed_mime_types: vec![
                "text/plain".to_string(),
                "text/markdown".to_string(),
                "text/html".to_string(),
                "application/json".to_string(),
            ],
            mcp_timeout_secs: DEFAULT_MCP_TIMEOUT_SECS,
            mcp_headers: HashMap::new(),
            mcp_bearer_token: None,
        }
    }
}

/// Worker pool size: `min(32, max(4, cores/2))`, matching the teacher's bounded-parallelism convention.
pub fn default_worker_count() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    (cores / 2).clamp(4, 32)
}

/// Immutable once emitted; persistence is by copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub targets: Vec<Target>,
    pub findings: Vec<Finding>,
    pub scanned_files: usize,
    pub elapsed_ms: u64,
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// `file hash -> findings`, with rule-version and age invalidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content_hash: String,
    pub rule_version: String,
    pub created_at: u64,
    pub findings: Vec<Finding>,
}

// ---------------------------------------------------------------------------
// Progress events
// ---------------------------------------------------------------------------

/// Typed event pushed by the orchestrator; the only point of contact with external consumers
/// (a CLI progress bar, a future TUI). Delivered over an `mpsc` channel, never a callback.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Start {
        total_items: usize,
    },
    BeginTarget {
        target: Target,
        items: usize,
    },
    FileScanned {
        virtual_path: String,
    },
    FindingsBatch {
        count: usize,
    },
    CompleteTarget {
        target: Target,
        findings: usize,
    },
    Finish {
        findings: usize,
        scanned_files: usize,
        elapsed_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn finding_fingerprint_ignores_confidence() {
        let a = Finding {
            rule_id: "R1".into(),
            severity: Severity::High,
            category: None,
            source: Source::Signature,
            message: "m".into(),
            remediation: None,
            file: "f.py".into(),
            line: Some(1),
            column: None,
            confidence: Some(0.5),
            match_len: None,
        };
        let mut b = a.clone();
        b.confidence = Some(0.9);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
