//! Read-only text views of the debugger for `resources/read`.

use serde_json::{json, Value};

use crate::client::BridgeClient;
use crate::error::{McpError, Result};

pub const STATUS_URI: &str = "debugger://status";
pub const MODULES_URI: &str = "debugger://modules";

#[derive(Debug, Clone, Copy)]
pub struct Resource {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const RESOURCES: &[Resource] = &[
    Resource {
        uri: STATUS_URI,
        name: "Debugger Status",
        description: "Architecture, session state and bridge version",
    },
    Resource {
        uri: MODULES_URI,
        name: "Loaded Modules",
        description: "Every module loaded in the debugged process",
    },
];

pub fn list() -> Value {
    let resources: Vec<Value> = RESOURCES
        .iter()
        .map(|r| {
            json!({
                "uri": r.uri,
                "name": r.name,
                "description": r.description,
                "mimeType": "text/plain",
            })
        })
        .collect();
    json!({ "resources": resources })
}

/// Text of the resource at `uri`. Bridge failures are reported inside the
/// text rather than as an error.
pub fn read(client: &BridgeClient, uri: &str) -> Result<String> {
    let text = match uri {
        STATUS_URI => status_text(client),
        MODULES_URI => modules_text(client),
        _ => return Err(McpError::ResourceNotFound(uri.to_string())),
    };
    Ok(text)
}

/// A field as display text: strings without quotes, anything else as JSON.
fn field(doc: &Value, key: &str, missing: &str) -> String {
    match doc.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => missing.to_string(),
    }
}

fn status_text(client: &BridgeClient) -> String {
    match client.get("/status", &[]) {
        Ok(status) => format!(
            "Debugger Status:\n\
             - Architecture: {}\n\
             - Debugging Active: {}\n\
             - Process Running: {}\n\
             - Bridge Version: {}\n",
            field(&status, "arch", "unknown"),
            field(&status, "debugging", "false"),
            field(&status, "running", "false"),
            field(&status, "version", "unknown"),
        ),
        Err(err) => format!("Error: {err}"),
    }
}

fn modules_text(client: &BridgeClient) -> String {
    let modules = match client.get("/modules", &[]) {
        Ok(Value::Array(modules)) if !modules.is_empty() => modules,
        Ok(_) => return "No modules loaded (process not running?)".to_string(),
        Err(err) => return format!("Error: {err}"),
    };

    let mut text = format!("Loaded Modules ({}):\n\n", modules.len());
    for module in &modules {
        text.push_str(&format!(
            "{}\n   Base: {}\n   Size: {}\n   Entry: {}\n   Path: {}\n\n",
            field(module, "name", "?"),
            field(module, "base", "?"),
            field(module, "size", "?"),
            field(module, "entry", "?"),
            field(module, "path", "?"),
        ));
    }
    text
}
