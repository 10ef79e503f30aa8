//! MCP Collector & Virtualizer (§4.9): a JSON-RPC 2.0 client over HTTP that retrieves
//! tools/prompts/resources/instructions from a Model Context Protocol server and
//! projects them as `ContentItem`s the rest of the engine can scan uniformly.
//!
//! This is the client-side mirror of the teacher's server-side `mcp.rs`/`mcp_http.rs`:
//! same JSON-RPC envelope shape and error-code handling, applied in the opposite
//! direction (we call a server instead of serving one).

use crate::error::McpError;
use crate::types::{ContentItem, FileType, McpScanKind, ScanOptions};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const METHOD_NOT_FOUND: i64 = -32601;

struct RpcClient {
    http: reqwest::blocking::Client,
    url: String,
    next_id: std::cell::Cell<u64>,
}

impl RpcClient {
    fn new(url: &str, options: &ScanOptions) -> Result<Self, McpError> {
        Url::parse(url).map_err(|_| McpError::InvalidUrl(url.to_string()))?;
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(options.mcp_timeout_secs));
        let mut headers = reqwest::header::HeaderMap::new();
        for (k, v) in &options.mcp_headers {
            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(k.as_bytes()),
                reqwest::header::HeaderValue::from_str(v),
            ) {
                headers.insert(name, value);
            }
        }
        if let Some(token) = &options.mcp_bearer_token {
            if let Ok(value) = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
        }
        builder = builder.default_headers(headers);
        let http = builder.build().map_err(|source| McpError::Transport {
            url: url.to_string(),
            source,
        })?;
        Ok(Self {
            http,
            url: url.to_string(),
            next_id: std::cell::Cell::new(1),
        })
    }

    /// Issue one JSON-RPC call. A `-32601` error is surfaced as `Ok(None)` (empty list,
    /// per §4.9) rather than an error; every other error propagates as [`McpError::Rpc`].
    fn call(&self, method: &str, params: Value) -> Result<Option<Value>, McpError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|source| McpError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let text = response.text().map_err(|source| McpError::Transport {
            url: self.url.clone(),
            source,
        })?;
        let parsed: Value = serde_json::from_str(&text)
            .map_err(|e| McpError::MalformedResponse(format!("{method}: {e}")))?;

        if let Some(error) = parsed.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            if code == METHOD_NOT_FOUND {
                return Ok(None);
            }
            return Err(McpError::Rpc { code, message });
        }

        Ok(parsed.get("result").cloned())
    }
}

#[derive(Debug, Clone)]
pub struct CollectedServer {
    pub host: String,
    pub items: Vec<ContentItem>,
    pub tool_count: usize,
    pub prompt_count: usize,
    pub resource_count: usize,
    pub has_instructions: bool,
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Collect one MCP server's tools/prompts/resources/instructions into `ContentItem`s.
pub fn collect_server(url: &str, options: &ScanOptions) -> Result<CollectedServer, McpError> {
    let host = host_of(url);
    let client = RpcClient::new(url, options)?;

    let _ = client.call(
        "initialize",
        json!({
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": { "name": "skillscan", "version": env!("CARGO_PKG_VERSION") }
        }),
    )?;

    let mut items = Vec::new();
    let mut tool_count = 0;
    let mut prompt_count = 0;
    let mut resource_count = 0;
    let mut has_instructions = false;

    if options.mcp_scan.contains(&McpScanKind::Tools) {
        if let Some(result) = client.call("tools/list", json!({}))? {
            if let Some(tools) = result.get("tools").and_then(Value::as_array) {
                for tool in tools {
                    tool_count += 1;
                    items.push(virtualize_tool(&host, tool));
                }
            }
        }
    }

    if options.mcp_scan.contains(&McpScanKind::Prompts) {
        if let Some(result) = client.call("prompts/list", json!({}))? {
            if let Some(prompts) = result.get("prompts").and_then(Value::as_array) {
                for prompt in prompts {
                    prompt_count += 1;
                    items.push(virtualize_prompt(&host, prompt));
                }
            }
        }
    }

    if options.mcp_scan.contains(&McpScanKind::Resources) {
        if let Some(result) = client.call("resources/list", json!({}))? {
            if let Some(resources) = result.get("resources").and_then(Value::as_array) {
                for resource in resources {
                    resource_count += 1;
                    items.push(virtualize_resource(&client, &host, resource, options));
                }
            }
        }
    }

    if options.mcp_scan.contains(&McpScanKind::Instructions) {
        if let Some(result) = client.call(
            "initialize",
            json!({
                "protocolVersion": "2025-06-18",
                "capabilities": {},
                "clientInfo": { "name": "skillscan", "version": env!("CARGO_PKG_VERSION") }
            }),
        )? {
            if let Some(instructions) = result.get("instructions").and_then(Value::as_str) {
                has_instructions = true;
                items.push(ContentItem::new(
                    format!("mcp://{host}/instructions.md"),
                    FileType::Markdown,
                    instructions.to_string(),
                ));
            }
        }
    }

    Ok(CollectedServer {
        host,
        items,
        tool_count,
        prompt_count,
        resource_count,
        has_instructions,
    })
}

fn virtualize_tool(host: &str, tool: &Value) -> ContentItem {
    let name = tool
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let description = tool
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("");
    let schema = tool
        .get("inputSchema")
        .map(|v| v.to_string())
        .unwrap_or_default();
    let content = format!("# {name}\n\n{description}\n\n{schema}");
    ContentItem::new(
        format!("mcp://{host}/tools/{name}"),
        FileType::Markdown,
        content,
    )
    .with_meta("mcp_kind", "tool")
}

fn virtualize_prompt(host: &str, prompt: &Value) -> ContentItem {
    let name = prompt
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let description = prompt
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("");
    let arguments = prompt
        .get("arguments")
        .map(|v| v.to_string())
        .unwrap_or_default();
    let template = prompt.get("template").and_then(Value::as_str).unwrap_or("");
    let content = format!("# {name}\n\n{description}\n\n{arguments}\n\n{template}");
    ContentItem::new(
        format!("mcp://{host}/prompts/{name}"),
        FileType::Markdown,
        content,
    )
    .with_meta("mcp_kind", "prompt")
}

fn virtualize_resource(
    client: &RpcClient,
    host: &str,
    resource: &Value,
    options: &ScanOptions,
) -> ContentItem {
    let name = resource
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let uri = resource.get("uri").and_then(Value::as_str).unwrap_or(name);
    let mime = resource
        .get("mimeType")
        .and_then(Value::as_str)
        .unwrap_or("text/plain");
    let file_type = if mime == "application/json" {
        FileType::Json
    } else {
        FileType::Markdown
    };
    let virtual_path = format!("mcp://{host}/resources/{name}");

    if options.mcp_read_resources && options.mcp_allowed_mime_types.iter().any(|m| m == mime) {
        if let Ok(Some(result)) = client.call("resources/read", json!({ "uri": uri })) {
            if let Some(contents) = result.get("contents").and_then(Value::as_array) {
                let mut text = String::new();
                for entry in contents {
                    if let Some(t) = entry.get("text").and_then(Value::as_str) {
                        text.push_str(t);
                    }
                }
                if text.len() <= options.mcp_resource_byte_cap {
                    return ContentItem::new(virtual_path, file_type, text)
                        .with_meta("mcp_kind", "resource");
                }
            }
        }
    }

    let metadata = format!("# {name}\n\nuri: {uri}\nmimeType: {mime}");
    ContentItem::new(virtual_path, file_type, metadata).with_meta("mcp_kind", "resource")
}

/// A `.mcp.json` / `claude_desktop_config.json`-shaped server entry, after parsing.
#[derive(Debug, Clone)]
pub enum McpServerSpec {
    Url {
        name: String,
        url: String,
    },
    /// stdio-launched server: introspection is out of scope for the core engine (§4.9).
    Command {
        name: String,
        command: String,
    },
}

/// Parse the `mcpServers` map out of an MCP JSON export file's contents.
pub fn parse_mcp_config(json_text: &str) -> Result<Vec<McpServerSpec>, McpError> {
    let value: Value =
        serde_json::from_str(json_text).map_err(|e| McpError::MalformedResponse(e.to_string()))?;
    let Some(servers) = value.get("mcpServers").and_then(Value::as_object) else {
        return Ok(Vec::new());
    };
    let mut specs = Vec::new();
    for (name, entry) in servers {
        if let Some(url) = entry.get("url").and_then(Value::as_str) {
            specs.push(McpServerSpec::Url {
                name: name.clone(),
                url: url.to_string(),
            });
        } else if let Some(command) = entry.get("command").and_then(Value::as_str) {
            specs.push(McpServerSpec::Command {
                name: name.clone(),
                command: command.to_string(),
            });
        }
    }
    Ok(specs)
}
