use super::missing;
use crate::host::DebugHost;
use crate::http::Response;
use crate::json::JsonObject;
use crate::params::Params;
use crate::router::{HandlerResult, Router};

/// Protocol version reported by `/status`.
pub const API_VERSION: u32 = 3;

pub(super) fn register(router: &mut Router) {
    router.route("/status", status).route("/cmd", exec_command);
}

fn status(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    let body = JsonObject::new()
        .number("version", API_VERSION)
        .string("arch", host.arch().as_str())
        .bool("debugging", host.is_debugging()?)
        .bool("running", host.is_running()?)
        .finish();
    Ok(Response::json(body))
}

fn exec_command(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(command) = params.get_bytes("cmd") else {
        return Ok(missing(&["cmd"]));
    };
    let ok = host.exec_command(command)?;
    Ok(Response::json(
        JsonObject::new()
            .bool("success", ok)
            .string("command", &String::from_utf8_lossy(command))
            .finish(),
    ))
}
