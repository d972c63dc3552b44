use std::io;

use dbgbridge_core::{init_logging, LogConfig};
use dbgbridge_mcp::{BridgeClient, McpServer};
use tracing::{info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the protocol, so logs stay on stderr.
    init_logging(&LogConfig::plugin());

    let client = BridgeClient::from_env();
    match client.get("/status", &[]) {
        Ok(status) => info!(
            bridge = client.base_url(),
            arch = status.get("arch").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
            "connected to debugger"
        ),
        Err(err) => warn!(
            bridge = client.base_url(),
            error = %err,
            "cannot reach the debugger yet; is the bridge plugin loaded?"
        ),
    }

    McpServer::new(client).serve(io::stdin().lock(), io::stdout().lock())?;
    Ok(())
}
