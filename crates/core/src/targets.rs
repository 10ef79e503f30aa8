//! Target discovery (§4.12): thin, external-to-the-core producers of [`Target`] records.
//! The engine is indifferent to how targets are produced — this module just wraps
//! well-known filesystem and MCP-config shapes into the opaque `Target` the engine consumes.

use crate::mcp::{parse_mcp_config, McpServerSpec};
use crate::types::{Target, TargetKind};
use ignore::WalkBuilder;
use std::path::Path;

/// Wrap an arbitrary directory (or file) as a single `path` target.
pub fn discover_path(root: &Path) -> Target {
    let name = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("target")
        .to_string();
    Target::new(TargetKind::Path, name, root.to_string_lossy().to_string())
}

/// Walk `root` for `SKILL.md`-rooted directories, in the teacher's `ignore::WalkBuilder`
/// idiom, and skip the conventional noise directories along the way.
pub fn discover_skills(root: &Path, skip_dirs: &[String]) -> Vec<Target> {
    let mut targets = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .filter_entry({
            let skip_dirs = skip_dirs.to_vec();
            move |entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|name| !skip_dirs.iter().any(|skip| skip == name))
                    .unwrap_or(true)
            }
        })
        .build();

    for entry in walker.flatten() {
        if entry.file_name() != "SKILL.md" {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("skill")
            .to_string();
        targets.push(Target::new(
            TargetKind::Skill,
            name,
            dir.to_string_lossy().to_string(),
        ));
    }
    targets
}

/// Parse `.mcp.json` / `claude_desktop_config.json`-shaped files at `paths` into `mcp`
/// targets. Command-addressed (stdio) servers are recorded with an informational meta
/// note rather than silently dropped — stdio introspection is out of scope (§4.9).
pub fn discover_mcp_configs(paths: &[std::path::PathBuf]) -> Vec<Target> {
    let mut targets = Vec::new();
    for path in paths {
        let Ok(text) = std::fs::read_to_string(path) else {
            tracing::warn!(path = %path.display(), "could not read MCP config file");
            continue;
        };
        let specs = match parse_mcp_config(&text) {
            Ok(specs) => specs,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "malformed MCP config file");
                continue;
            }
        };
        for spec in specs {
            match spec {
                McpServerSpec::Url { name, url } => {
                    targets.push(Target::new(TargetKind::Mcp, name, url));
                }
                McpServerSpec::Command { name, command } => {
                    let mut target = Target::new(TargetKind::Mcp, name, String::new());
                    target.meta.insert("stdio_command".to_string(), command);
                    target.meta.insert(
                        "note".to_string(),
                        "stdio MCP server introspection is out of scope".to_string(),
                    );
                    targets.push(target);
                }
            }
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_path_wraps_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = discover_path(dir.path());
        assert_eq!(target.kind, TargetKind::Path);
    }

    #[test]
    fn discover_skills_finds_skill_md() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = dir.path().join("my-skill");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("SKILL.md"), "# My Skill").unwrap();

        let targets = discover_skills(dir.path(), &[]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].kind, TargetKind::Skill);
        assert_eq!(targets[0].name, "my-skill");
    }

    #[test]
    fn discover_skills_respects_skip_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = dir.path().join("node_modules").join("nested-skill");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("SKILL.md"), "# Nested").unwrap();

        let targets = discover_skills(dir.path(), &["node_modules".to_string()]);
        assert!(targets.is_empty());
    }

    #[test]
    fn discover_mcp_configs_parses_url_servers() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".mcp.json");
        std::fs::write(
            &config_path,
            r#"{"mcpServers":{"remote":{"url":"https://example.com/mcp"}}}"#,
        )
        .unwrap();

        let targets = discover_mcp_configs(&[config_path]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].kind, TargetKind::Mcp);
        assert_eq!(targets[0].path, "https://example.com/mcp");
    }

    #[test]
    fn discover_mcp_configs_records_stdio_servers_with_a_note() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".mcp.json");
        std::fs::write(
            &config_path,
            r#"{"mcpServers":{"local":{"command":"npx","args":["server"]}}}"#,
        )
        .unwrap();

        let targets = discover_mcp_configs(&[config_path]);
        assert_eq!(targets.len(), 1);
        assert!(targets[0].meta.contains_key("stdio_command"));
    }
}
