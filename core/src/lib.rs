//! Embedded HTTP control plane for a debugger.
//!
//! # Overview
//! A debugger loads the bridge, hands it a [`DebugHost`] and gets back a
//! [`BridgeServer`] listening on loopback. External clients then drive the
//! debugger with plain `GET /path?key=value` requests and receive small JSON
//! documents in return.
//!
//! # Design
//! - The server owns one background thread and serves one connection at a
//!   time; the debugger's own threads never block on it.
//! - Requests are parsed from a single bounded read, routed by path only and
//!   answered with a fully buffered response, then the connection closes.
//! - Handlers are stateless functions over [`Params`] and the host; host
//!   faults and handler panics are turned into 500 responses at one place,
//!   [`Router::dispatch`], so a bad request can never take the host down.
//! - Everything the bridge knows about the debugger goes through the
//!   [`DebugHost`] trait, which keeps the core testable without one.

pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod host;
pub mod http;
pub mod json;
pub mod logging;
pub mod params;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use connection::ServerStats;
pub use error::{CapacityError, ConfigError, HexError, HostFault, ServerError};
pub use handlers::{API_VERSION, DEFAULT_SEARCH_RESULTS, MAX_MEMORY_READ};
pub use host::{
    AnnotationInfo, Arch, BookmarkInfo, CommentText, DebugHost, Flag, FunctionInfo,
    FunctionRange, HostList, HostResult, Instruction, LabelText, MemoryWrite, ModuleInfo,
    Register, SymbolInfo, SymbolKind,
};
pub use http::{Request, Response, StatusCode};
pub use logging::{init_logging, LogConfig};
pub use params::Params;
pub use router::Router;
pub use server::{BridgeServer, StopOutcome};
