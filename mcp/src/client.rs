//! Blocking HTTP client for the bridge's `GET /path?key=value` API.

use std::time::Duration;

use dbgbridge_core::config::DEFAULT_PORT;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::Value;
use tracing::debug;

use crate::error::BridgeError;

/// Base URL of the bridge, e.g. `http://127.0.0.1:8888`.
pub const ENV_URL: &str = "DBGBRIDGE_URL";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn default_url() -> String {
    format!("http://127.0.0.1:{DEFAULT_PORT}")
}

#[derive(Clone)]
pub struct BridgeClient {
    base_url: String,
    agent: ureq::Agent,
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BridgeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    /// Client for `DBGBRIDGE_URL`, or the default port on loopback.
    pub fn from_env() -> Self {
        let url = std::env::var(ENV_URL)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(default_url);
        Self::new(url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full request URL; every query value is percent-encoded.
    pub fn url(&self, endpoint: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}{}", self.base_url, endpoint);
        for (i, (key, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.extend(utf8_percent_encode(value, NON_ALPHANUMERIC));
        }
        url
    }

    /// GET `endpoint` and decode the answer.
    ///
    /// A non-2xx status is an error carrying the body text.
    pub fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value, BridgeError> {
        let url = self.url(endpoint, query);
        debug!(%url, "bridge request");

        let mut response = self.agent.get(&url).call()?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        if !(200..300).contains(&status) {
            return Err(BridgeError::Http { status, body });
        }
        Ok(parse_body(&body))
    }
}

/// JSON when the body parses as JSON, otherwise the trimmed text.
pub fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.trim().to_string()))
}
