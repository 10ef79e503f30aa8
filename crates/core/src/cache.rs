//! Scan Cache (§4.6): content-addressed, keyed by `virtual_path`, invalidated by rule-version
//! mismatch, age, or content-hash mismatch.

use crate::error::CacheError;
use crate::types::{CacheEntry, Finding, DEFAULT_CACHE_TTL_SECS};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Default path: the platform cache directory's `skillscan/cache.json`.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("skillscan").join("cache.json"))
}

/// Concurrent, content-addressed cache. Entries live in a `DashMap` (teacher's shared-map
/// convention for state touched from every scheduler worker, per `crates/core/src/types.rs`'s
/// `stub_cache`) rather than a single `Mutex<HashMap>`, since `lookup`/`store` are called from
/// every rayon worker scanning a target concurrently.
pub struct ScanCache {
    entries: DashMap<String, CacheEntry>,
    dirty: AtomicBool,
    ttl_secs: u64,
}

impl ScanCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: DashMap::new(),
            dirty: AtomicBool::new(false),
            ttl_secs,
        }
    }

    /// Load from `path`. A missing or corrupt file resets the cache silently (§7 CacheError policy).
    pub fn load(path: &Path, ttl_secs: u64) -> Self {
        let entries = std::fs::read_to_string(path)
            .ok()
            .and_then(|text| serde_json::from_str::<HashMap<String, CacheEntry>>(&text).ok())
            .unwrap_or_default();
        Self {
            entries: entries.into_iter().collect(),
            dirty: AtomicBool::new(false),
            ttl_secs,
        }
    }

    /// Look up a cached result for `virtual_path`, validating against `rule_version` and `content`.
    pub fn lookup(
        &self,
        virtual_path: &str,
        rule_version: &str,
        content: &str,
    ) -> Option<Vec<Finding>> {
        let entry = self.entries.get(virtual_path)?;
        if entry.rule_version != rule_version {
            drop(entry);
            self.entries.remove(virtual_path);
            return None;
        }
        if now_secs().saturating_sub(entry.created_at) > self.ttl_secs {
            drop(entry);
            self.entries.remove(virtual_path);
            return None;
        }
        let hash = content_hash(content);
        if entry.content_hash != hash {
            drop(entry);
            self.entries.remove(virtual_path);
            return None;
        }
        Some(entry.findings.clone())
    }

    pub fn store(
        &self,
        virtual_path: &str,
        rule_version: &str,
        content: &str,
        findings: Vec<Finding>,
    ) {
        let entry = CacheEntry {
            content_hash: content_hash(content),
            rule_version: rule_version.to_string(),
            created_at: now_secs(),
            findings,
        };
        self.entries.insert(virtual_path.to_string(), entry);
        self.dirty.store(true, Ordering::Relaxed);
    }

    /// Flush to `path` if dirty. Save failures are logged, never fatal (§7).
    pub fn flush(&self, path: &Path) -> Result<(), CacheError> {
        if !self.dirty.load(Ordering::Relaxed) {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot: HashMap<String, CacheEntry> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let json = serde_json::to_string(&snapshot)?;
        std::fs::write(path, json)?;
        self.dirty.store(false, Ordering::Relaxed);
        Ok(())
    }
}

impl Default for ScanCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL_SECS)
    }
}
