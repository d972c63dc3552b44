//! Error types for the bridge.
//!
//! # Design
//! `HostFault` is the only error a capability provider can raise; the
//! dispatcher turns it into a 500 response, so it carries nothing but a
//! message. A capability that merely *fails* (breakpoint not set, label not
//! found) reports that through its return value instead. The remaining
//! errors belong to server startup and configuration and are returned to
//! the host that embeds the bridge.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// An unexpected fault raised by a capability provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostFault {
    message: String,
}

impl HostFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The host did not provide the named capability.
    pub fn unavailable(capability: &str) -> Self {
        Self::new(format!("capability '{capability}' is not provided by the host"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound (port already in use?).
    #[error("bind {addr} failed: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The bound socket could not be configured for non-blocking accept.
    #[error("listener setup failed: {0}")]
    Listener(#[source] io::Error),

    /// The loop thread could not be spawned.
    #[error("failed to spawn server thread: {0}")]
    Spawn(#[source] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },

    #[error("{key} must be at least {min}, got {value}")]
    OutOfRange { key: String, value: u64, min: u64 },

    #[error("{key} must be at most {max}, got {value}")]
    TooLarge { key: String, value: u64, max: u64 },
}

/// Malformed hex text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("invalid hex digit at position {position}")]
    InvalidDigit { position: usize },
}

/// Text that does not fit a bounded host buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("text of {len} bytes exceeds capacity of {capacity} bytes")]
pub struct CapacityError {
    pub len: usize,
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_names_the_capability() {
        let fault = HostFault::unavailable("memory_read");
        assert_eq!(
            fault.to_string(),
            "capability 'memory_read' is not provided by the host"
        );
    }

    #[test]
    fn config_error_converts_into_server_error() {
        let err: ServerError = ConfigError::OutOfRange {
            key: "poll_interval_ms".to_string(),
            value: 0,
            min: 1,
        }
        .into();
        assert_eq!(err.to_string(), "poll_interval_ms must be at least 1, got 0");
    }
}
