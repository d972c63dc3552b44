//! Model Context Protocol front end for the debugger bridge.
//!
//! An MCP client (an assistant or an IDE) talks JSON-RPC to this process over
//! stdio; every tool it calls becomes one or more `GET` requests against the
//! bridge's HTTP API. Nothing here touches the debugger directly.
//!
//! - [`client`]: the blocking HTTP client and its error mapping.
//! - [`tools`]: the tool catalogue, argument conversion and fallbacks.
//! - [`resources`], [`prompts`]: read-only views and canned prompts.
//! - [`server`]: JSON-RPC framing and method dispatch.

pub mod client;
pub mod error;
pub mod prompts;
pub mod resources;
pub mod server;
pub mod tools;

pub use client::BridgeClient;
pub use error::{BridgeError, McpError};
pub use server::McpServer;
pub use tools::{Outcome, Tool};
