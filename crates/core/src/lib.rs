//! skillscan-core — detection engine and scan orchestrator for agent skill repos,
//! installed browser/IDE extensions, and MCP servers.
//!
//! The crate is organized leaves-first, matching the teacher's module layout:
//! rule compilation and the file-type classifier sit at the bottom, the matcher and
//! heuristic analyzers build on them, the scheduler and cache coordinate scanning a
//! target's content, the meta-analyzer and MCP virtualizer sit above that, and the
//! orchestrator ties everything together behind one `scan()` entry point.

pub mod cache;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod fix;
pub mod heuristics;
pub mod matcher;
pub mod mcp;
pub mod meta;
pub mod orchestrator;
pub mod report;
pub mod rules;
pub mod scheduler;
pub mod store;
pub mod targets;
pub mod types;

pub use error::{CacheError, ContentError, McpError, RuleError, ScanError};
pub use orchestrator::{Engine, NoopProgressSink, ProgressSink};
pub use types::{
    CacheEntry, CompiledRule, ContentItem, FileType, Finding, ScanOptions, ScanResult, Severity,
    Source, Target, TargetKind,
};
