//! Server configuration.
//!
//! Values come from three places, later ones overriding earlier ones:
//! built-in defaults, a serialized config (the plugin accepts JSON) and
//! `DBGBRIDGE_*` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 16 * 1024;
/// Largest accepted `max_request_size`; the loop keeps one buffer this big.
pub const MAX_REQUEST_SIZE_LIMIT: usize = 1024 * 1024;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 2_000;

pub const ENV_PORT: &str = "DBGBRIDGE_PORT";
pub const ENV_POLL_MS: &str = "DBGBRIDGE_POLL_MS";
pub const ENV_READ_TIMEOUT_MS: &str = "DBGBRIDGE_READ_TIMEOUT_MS";
pub const ENV_JOIN_TIMEOUT_MS: &str = "DBGBRIDGE_JOIN_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Loopback port; `0` lets the OS pick one.
    pub port: u16,
    /// Sleep between accept attempts while idle.
    pub poll_interval_ms: u64,
    /// Upper bound for the single receive of a request, at most
    /// [`MAX_REQUEST_SIZE_LIMIT`].
    pub max_request_size: usize,
    /// Read/write timeout on accepted sockets; `0` disables it.
    pub read_timeout_ms: u64,
    /// How long `stop` waits for the loop thread.
    pub join_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    /// Overlay whichever `DBGBRIDGE_*` variables are set.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_PORT) {
            self.port = parse(ENV_PORT, &value)?;
        }
        if let Some(value) = lookup(ENV_POLL_MS) {
            self.poll_interval_ms = parse(ENV_POLL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_READ_TIMEOUT_MS) {
            self.read_timeout_ms = parse(ENV_READ_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_JOIN_TIMEOUT_MS) {
            self.join_timeout_ms = parse(ENV_JOIN_TIMEOUT_MS, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::OutOfRange {
                key: "poll_interval_ms".to_string(),
                value: 0,
                min: 1,
            });
        }
        if self.max_request_size == 0 {
            return Err(ConfigError::OutOfRange {
                key: "max_request_size".to_string(),
                value: 0,
                min: 1,
            });
        }
        if self.max_request_size > MAX_REQUEST_SIZE_LIMIT {
            return Err(ConfigError::TooLarge {
                key: "max_request_size".to_string(),
                value: self.max_request_size as u64,
                max: MAX_REQUEST_SIZE_LIMIT as u64,
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// `None` when timeouts are disabled.
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
