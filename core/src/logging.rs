//! Logging setup for processes that embed the bridge.
//!
//! The library itself only emits `tracing` events; whoever loads it decides
//! whether and how they are printed. `RUST_LOG` always wins over the
//! configured level.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level or filter directive, e.g. `info` or `dbgbridge_core=debug`.
    pub level: String,
    pub timestamps: bool,
    /// Include the module target in each line.
    pub show_target: bool,
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            timestamps: true,
            show_target: true,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    pub fn debug() -> Self {
        Self {
            level: "debug".to_string(),
            ..Self::default()
        }
    }

    /// Plain output for a host that captures our stderr into its own log.
    pub fn plugin() -> Self {
        Self {
            level: "info".to_string(),
            timestamps: false,
            show_target: false,
            ansi_colors: false,
        }
    }

    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }

    /// The configured level as a `tracing` level; unknown text reads as info.
    pub fn get_level(&self) -> Level {
        match self.level.to_ascii_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Install a stderr subscriber for `config`.
///
/// Returns `false` when a global subscriber was already installed; the
/// existing one stays in place.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new(config.get_level().as_str()));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_ansi(config.ansi_colors)
        .with_target(config.show_target)
        .with_writer(std::io::stderr);

    let result = if config.timestamps {
        builder.try_init()
    } else {
        builder.without_time().try_init()
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing() {
        assert_eq!(LogConfig::default().get_level(), Level::INFO);
        assert_eq!(LogConfig::debug().get_level(), Level::DEBUG);
        assert_eq!(LogConfig::default().with_level("WARNING").get_level(), Level::WARN);
        assert_eq!(LogConfig::default().with_level("loud").get_level(), Level::INFO);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: LogConfig = serde_json::from_str(r#"{"level":"trace"}"#).unwrap();
        assert_eq!(config.level, "trace");
        assert!(config.timestamps);
        assert!(config.ansi_colors);
    }

    #[test]
    fn second_init_is_a_no_op() {
        init_logging(&LogConfig::plugin());
        assert!(!init_logging(&LogConfig::debug()));
    }
}
