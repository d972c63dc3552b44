//! Errors for the MCP front end.
//!
//! [`BridgeError`] is what a single HTTP call to the bridge can fail with;
//! tools catch it and answer with a fallback document. [`McpError`] is what
//! a JSON-RPC request can fail with and maps onto a JSON-RPC error code.

use std::io;

use thiserror::Error;

/// Failure of one request to the bridge's HTTP API.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Request timed out - is the debugger running?")]
    Timeout,

    #[error("Cannot connect to the debugger - is the bridge plugin loaded?")]
    Connect,

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unexpected error: {0}")]
    Other(String),
}

impl From<ureq::Error> for BridgeError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => Self::Timeout,
            ureq::Error::HostNotFound => Self::Connect,
            ureq::Error::Io(io) => match io.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
                _ => Self::Connect,
            },
            other => Self::Other(other.to_string()),
        }
    }
}

/// Failure of one JSON-RPC request.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Request too large (max {max} bytes)")]
    TooLarge { max: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown method: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Unknown resource: {0}")]
    ResourceNotFound(String),
}

impl McpError {
    pub fn to_jsonrpc_code(&self) -> i32 {
        match self {
            McpError::Parse(_) => -32700,
            McpError::TooLarge { .. } | McpError::InvalidRequest(_) => -32600,
            McpError::MethodNotFound(_)
            | McpError::ToolNotFound(_)
            | McpError::PromptNotFound(_) => -32601,
            McpError::InvalidParams(_) | McpError::ResourceNotFound(_) => -32602,
        }
    }
}

pub type Result<T> = std::result::Result<T, McpError>;
