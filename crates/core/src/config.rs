//! Project configuration, loaded from `.skillscan.toml` (teacher's `.codescope.toml`
//! convention): scan roots to skip, extra rule directories, cache TTL, a concurrency
//! override, and MCP scan defaults. CLI flags always take precedence over file values.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Raw on-disk shape of `.skillscan.toml`. Every field is optional so a partial file
/// (or none at all) just falls back to [`ScanConfig::default`].
#[derive(Debug, Clone, Deserialize, Default)]
struct RawConfig {
    scan_dirs: Option<Vec<String>>,
    skip_dirs: Option<Vec<String>>,
    rule_paths: Option<Vec<String>>,
    cache_ttl_secs: Option<u64>,
    max_workers: Option<usize>,
    use_behavioral: Option<bool>,
    mcp_scan: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub scan_dirs: Vec<String>,
    pub skip_dirs: Vec<String>,
    pub rule_paths: Vec<PathBuf>,
    pub cache_ttl_secs: u64,
    pub max_workers: Option<usize>,
    pub use_behavioral: bool,
    pub mcp_scan: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_dirs: Vec::new(),
            skip_dirs: vec![
                ".git".to_string(),
                "node_modules".to_string(),
                "__pycache__".to_string(),
                "target".to_string(),
                "dist".to_string(),
                "build".to_string(),
                ".venv".to_string(),
            ],
            rule_paths: Vec::new(),
            cache_ttl_secs: crate::types::DEFAULT_CACHE_TTL_SECS,
            max_workers: None,
            use_behavioral: true,
            mcp_scan: vec![
                "tools".to_string(),
                "instructions".to_string(),
                "prompts".to_string(),
            ],
        }
    }
}

impl ScanConfig {
    /// Load `.skillscan.toml` from `root`, falling back to defaults if absent or
    /// malformed (a malformed project config is a soft failure, logged and ignored —
    /// it is not worth aborting a scan over).
    pub fn load(root: &Path) -> Self {
        Self::load_from(root, None)
    }

    /// Load a project config, using `explicit` in place of `<root>/.skillscan.toml` when given
    /// (the CLI's `--config` override).
    pub fn load_from(root: &Path, explicit: Option<&Path>) -> Self {
        let owned;
        let path = match explicit {
            Some(path) => path,
            None => {
                owned = root.join(".skillscan.toml");
                &owned
            }
        };
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        let raw: RawConfig = match toml::from_str(&text) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring malformed .skillscan.toml");
                return Self::default();
            }
        };

        let mut config = Self::default();
        if let Some(dirs) = raw.scan_dirs {
            config.scan_dirs = dirs;
        }
        if let Some(dirs) = raw.skip_dirs {
            config.skip_dirs = dirs;
        }
        if let Some(paths) = raw.rule_paths {
            config.rule_paths = paths.into_iter().map(|p| root.join(p)).collect();
        }
        if let Some(ttl) = raw.cache_ttl_secs {
            config.cache_ttl_secs = ttl;
        }
        if let Some(workers) = raw.max_workers {
            config.max_workers = Some(workers);
        }
        if let Some(behavioral) = raw.use_behavioral {
            config.use_behavioral = behavioral;
        }
        if let Some(scan) = raw.mcp_scan {
            config.mcp_scan = scan;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScanConfig::load(dir.path());
        assert!(config.use_behavioral);
        assert!(config.scan_dirs.is_empty());
    }

    #[test]
    fn loads_overrides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".skillscan.toml"),
            r#"
scan_dirs = ["skills"]
cache_ttl_secs = 3600
use_behavioral = false
"#,
        )
        .unwrap();
        let config = ScanConfig::load(dir.path());
        assert_eq!(config.scan_dirs, vec!["skills".to_string()]);
        assert_eq!(config.cache_ttl_secs, 3600);
        assert!(!config.use_behavioral);
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".skillscan.toml"), "not valid toml [[[").unwrap();
        let config = ScanConfig::load(dir.path());
        assert_eq!(config.cache_ttl_secs, crate::types::DEFAULT_CACHE_TTL_SECS);
    }

    #[test]
    fn explicit_path_overrides_root_skillscan_toml() {
        let dir = tempfile::tempdir().unwrap();
        let explicit_path = dir.path().join("custom.toml");
        std::fs::write(&explicit_path, "cache_ttl_secs = 42\n").unwrap();
        let config = ScanConfig::load_from(dir.path(), Some(&explicit_path));
        assert_eq!(config.cache_ttl_secs, 42);
    }
}
