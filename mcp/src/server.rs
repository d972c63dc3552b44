//! Line-delimited JSON-RPC 2.0 over a reader/writer pair.
//!
//! Each input line is one request; each request with an `id` gets exactly
//! one response line. Notifications (no `id`) and blank lines get none.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::client::BridgeClient;
use crate::error::{McpError, Result};
use crate::tools::{self, Outcome, Tool};
use crate::{prompts, resources};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "dbgbridge-mcp";
/// Longest request line accepted.
pub const MAX_LINE: usize = 1024 * 1024;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock {
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ToolResult {
    content: Vec<ContentBlock>,
    #[serde(rename = "isError")]
    is_error: bool,
}

impl ToolResult {
    fn from_outcome(outcome: &Outcome) -> Result<Self> {
        Ok(Self {
            content: vec![ContentBlock::Text {
                text: serde_json::to_string_pretty(outcome.value())?,
            }],
            is_error: outcome.is_fallback(),
        })
    }
}

fn error_response(id: Value, err: &McpError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": err.to_jsonrpc_code(),
            "message": err.to_string(),
        },
    })
}

#[derive(Debug)]
pub struct McpServer {
    client: BridgeClient,
}

impl McpServer {
    pub fn new(client: BridgeClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &BridgeClient {
        &self.client
    }

    /// Answer requests from `input` until it reaches EOF.
    pub fn serve<R: BufRead, W: Write>(&self, input: R, mut output: W) -> io::Result<()> {
        info!(bridge = self.client.base_url(), "serving MCP on stdio");
        for line in input.lines() {
            let line = line?;
            if let Some(response) = self.handle_line(&line) {
                writeln!(output, "{response}")?;
                output.flush()?;
            }
        }
        info!("input closed, shutting down");
        Ok(())
    }

    /// The response to one request line, if it calls for one.
    pub fn handle_line(&self, line: &str) -> Option<Value> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if line.len() > MAX_LINE {
            error!(size = line.len(), "request too large");
            return Some(error_response(Value::Null, &McpError::TooLarge { max: MAX_LINE }));
        }

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => {
                error!(error = %err, "failed to parse request");
                return Some(error_response(Value::Null, &McpError::Parse(err)));
            }
        };
        if request.jsonrpc != "2.0" {
            let err = McpError::InvalidRequest(format!("unsupported jsonrpc '{}'", request.jsonrpc));
            return Some(error_response(request.id.unwrap_or(Value::Null), &err));
        }

        let Some(id) = request.id else {
            self.handle_notification(&request.method);
            return None;
        };

        Some(match self.dispatch(&request.method, &request.params) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(err) => {
                debug!(method = %request.method, error = %err, "request failed");
                error_response(id, &err)
            }
        })
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => info!("client initialized"),
            "notifications/cancelled" => debug!("request cancelled"),
            other => debug!(method = other, "unknown notification"),
        }
    }

    fn dispatch(&self, method: &str, params: &Value) -> Result<Value> {
        match method {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => {
                let listed: Vec<Value> = tools::tools().iter().map(Tool::describe).collect();
                Ok(json!({ "tools": listed }))
            }
            "tools/call" => self.call_tool(params),
            "resources/list" => Ok(resources::list()),
            "resources/read" => {
                let uri = required_str(params, "uri")?;
                let text = resources::read(&self.client, uri)?;
                Ok(json!({
                    "contents": [{ "uri": uri, "mimeType": "text/plain", "text": text }],
                }))
            }
            "prompts/list" => Ok(prompts::list()),
            "prompts/get" => prompts::get(required_str(params, "name")?),
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false },
                "prompts": { "listChanged": false },
            },
            "instructions": format!(
                "Debugger bridge at {} with {} tools",
                self.client.base_url(),
                tools::tools().len()
            ),
        })
    }

    fn call_tool(&self, params: &Value) -> Result<Value> {
        let name = required_str(params, "name")?;
        let tool = tools::find(name).ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;

        let empty = Map::new();
        let args = match params.get("arguments") {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(args)) => args,
            Some(_) => {
                return Err(McpError::InvalidParams("'arguments' must be an object".to_string()))
            }
        };

        debug!(tool = name, "tool call");
        let outcome = tool.call(&self.client, args)?;
        Ok(serde_json::to_value(ToolResult::from_outcome(&outcome)?)?)
    }
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::InvalidParams(format!("Missing '{key}' parameter")))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Nothing listens on port 1, and none of these tests reach the bridge.
    fn server() -> McpServer {
        McpServer::new(BridgeClient::new("http://127.0.0.1:1"))
    }

    fn request(method: &str, params: Value) -> String {
        json!({ "jsonrpc": "2.0", "id": 7, "method": method, "params": params }).to_string()
    }

    #[test]
    fn initialize_reports_capabilities() {
        let response = server().handle_line(&request("initialize", json!({}))).unwrap();
        assert_eq!(response["id"], 7);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[test]
    fn tools_list_carries_schemas() {
        let response = server().handle_line(&request("tools/list", json!({}))).unwrap();
        let listed = response["result"]["tools"].as_array().unwrap();
        assert_eq!(listed.len(), tools::tools().len());

        let read = listed.iter().find(|t| t["name"] == "read_memory").unwrap();
        assert_eq!(read["inputSchema"]["required"], json!(["addr"]));
        assert_eq!(read["inputSchema"]["properties"]["size"]["default"], 16);
    }

    #[test]
    fn malformed_lines() {
        let response = server().handle_line("{not json").unwrap();
        assert_eq!(response["error"]["code"], -32700);
        assert_eq!(response["id"], Value::Null);

        let huge = format!("\"{}\"", "a".repeat(MAX_LINE + 1));
        assert_eq!(server().handle_line(&huge).unwrap()["error"]["code"], -32600);

        let old = r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#;
        assert_eq!(server().handle_line(old).unwrap()["error"]["code"], -32600);

        assert!(server().handle_line("   ").is_none());
    }

    #[test]
    fn notifications_get_no_response() {
        let line = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(server().handle_line(line).is_none());
    }

    #[test]
    fn unknown_method_and_tool() {
        let response = server().handle_line(&request("tools/delete", json!({}))).unwrap();
        assert_eq!(response["error"]["code"], -32601);

        let response = server()
            .handle_line(&request("tools/call", json!({ "name": "format_disk" })))
            .unwrap();
        assert_eq!(response["error"]["code"], -32601);
        assert!(response["error"]["message"].as_str().unwrap().contains("format_disk"));
    }

    #[test]
    fn tool_call_argument_errors_are_invalid_params() {
        let response = server().handle_line(&request("tools/call", json!({}))).unwrap();
        assert_eq!(response["error"]["code"], -32602);

        let response = server()
            .handle_line(&request("tools/call", json!({ "name": "get_label", "arguments": {} })))
            .unwrap();
        assert_eq!(response["error"]["code"], -32602);

        let response = server()
            .handle_line(&request(
                "tools/call",
                json!({ "name": "get_label", "arguments": ["0x1000"] }),
            ))
            .unwrap();
        assert_eq!(response["error"]["code"], -32602);
    }

    #[test]
    fn prompts_round_trip() {
        let response = server()
            .handle_line(&request("prompts/get", json!({ "name": "trace_execution" })))
            .unwrap();
        assert_eq!(response["result"]["messages"][0]["role"], "user");

        let response = server().handle_line(&request("prompts/list", json!({}))).unwrap();
        assert_eq!(response["result"]["prompts"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn serve_writes_one_line_per_request() {
        let input = format!(
            "{}\n{}\n{}\n",
            request("ping", json!({})),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            request("resources/list", json!({}))
        );
        let mut output = Vec::new();
        server().serve(input.as_bytes(), &mut output).unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["result"], json!({}));
        assert_eq!(lines[1]["result"]["resources"].as_array().unwrap().len(), 2);
    }
}
