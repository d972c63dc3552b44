//! C-ABI plugin glue around `dbgbridge-core`.
//!
//! # Overview
//! The debugger fills a [`DbgHostApi`] capability table, calls
//! `dbgbridge_start` when the plugin loads and `dbgbridge_stop` when it
//! unloads. In between, the bridge serves HTTP on its own thread and calls
//! back into the table for every request.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A missing capability pointer is not an error at start; the request
//!   that needs it gets a 500 naming the capability.
//! - The caller owns the returned `FfiBridge*` and must release it with
//!   `dbgbridge_stop`.

pub mod host;
pub mod types;

use std::error::Error;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dbgbridge_core::{init_logging, BridgeServer, DebugHost, LogConfig, ServerConfig, API_VERSION};
use tracing::{error, info, warn};

pub use host::FfiHost;
use types::*;

/// `null` means defaults; otherwise a JSON object of `ServerConfig` fields.
/// Environment variables apply on top of either.
fn load_config(config_json: *const c_char) -> Result<ServerConfig, Box<dyn Error>> {
    let config = if config_json.is_null() {
        ServerConfig::default()
    } else {
        let text = unsafe { CStr::from_ptr(config_json) }.to_str()?;
        serde_json::from_str(text)?
    };
    Ok(config.with_env()?)
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Start the bridge over `api`.
///
/// The table is copied; `api` itself need not outlive the call, but its
/// `ctx` and function pointers must stay valid until `dbgbridge_stop`.
/// Returns null if `api` is null or names an unknown architecture, the
/// config is invalid, or the port cannot be bound.
#[unsafe(no_mangle)]
pub extern "C" fn dbgbridge_start(
    api: *const DbgHostApi,
    config_json: *const c_char,
) -> *mut FfiBridge {
    catch_unwind(|| {
        if api.is_null() {
            return std::ptr::null_mut();
        }
        let api = unsafe { *api };
        let config = match load_config(config_json) {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "invalid bridge configuration");
                return std::ptr::null_mut();
            }
        };

        let host: Arc<dyn DebugHost> = match FfiHost::new(api) {
            Ok(host) => Arc::new(host),
            Err(fault) => {
                error!(error = %fault, "rejected host table");
                return std::ptr::null_mut();
            }
        };
        match BridgeServer::start(config, host) {
            Ok(server) => Box::into_raw(Box::new(FfiBridge { server })),
            Err(e) => {
                error!(error = %e, "bridge failed to start");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Stop the bridge and free `bridge`.
///
/// Returns `true` when the server thread exited within the join timeout,
/// `false` if it had to be left running detached. Null is a no-op that
/// returns `true`.
#[unsafe(no_mangle)]
pub extern "C" fn dbgbridge_stop(bridge: *mut FfiBridge) -> bool {
    if bridge.is_null() {
        return true;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let mut bridge = unsafe { Box::from_raw(bridge) };
        let outcome = bridge.server.stop();
        if !outcome.is_stopped() {
            warn!("bridge thread abandoned at unload");
        }
        outcome.is_stopped()
    }))
    .unwrap_or(false)
}

/// Bound port of a running bridge, 0 for null.
#[unsafe(no_mangle)]
pub extern "C" fn dbgbridge_port(bridge: *const FfiBridge) -> u16 {
    if bridge.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { &*bridge }.server.port())).unwrap_or(0)
}

/// Whether the server loop is still accepting connections.
#[unsafe(no_mangle)]
pub extern "C" fn dbgbridge_is_running(bridge: *const FfiBridge) -> bool {
    if bridge.is_null() {
        return false;
    }
    catch_unwind(AssertUnwindSafe(|| unsafe { &*bridge }.server.is_running())).unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

/// Protocol version reported by `/status`.
#[unsafe(no_mangle)]
pub extern "C" fn dbgbridge_api_version() -> u32 {
    API_VERSION
}

/// Install the stderr log subscriber at `level` (`"info"` when null).
///
/// Returns `false` if a subscriber was already installed.
#[unsafe(no_mangle)]
pub extern "C" fn dbgbridge_init_logging(level: *const c_char) -> bool {
    catch_unwind(|| {
        let mut config = LogConfig::plugin();
        if !level.is_null() {
            let level = unsafe { CStr::from_ptr(level) }.to_string_lossy();
            config = config.with_level(&level);
        }
        let installed = init_logging(&config);
        if installed {
            info!(level = %config.level, "logging initialized");
        }
        installed
    })
    .unwrap_or(false)
}
