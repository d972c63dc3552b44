use super::missing;
use crate::host::DebugHost;
use crate::http::Response;
use crate::json::{self, JsonObject};
use crate::params::Params;
use crate::router::{HandlerResult, Router};

/// Largest read a single `/memory/read` may request.
pub const MAX_MEMORY_READ: u64 = 1024 * 1024;

pub(super) fn register(router: &mut Router) {
    router
        .route("/memory/read", read)
        .route("/memory/write", write);
}

fn read(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(addr), Some(size)) = (params.get_address("addr"), params.get_address("size")) else {
        return Ok(missing(&["addr", "size"]));
    };
    if size > MAX_MEMORY_READ {
        return Ok(Response::bad_request("Size too large (max 1MB)"));
    }

    let bytes = host.memory_read(addr, size as usize)?;
    let body = JsonObject::new()
        .bool("success", bytes.is_some())
        .address("address", addr);
    let body = match bytes {
        Some(bytes) => body
            .number("size", bytes.len())
            .string("data", &json::encode_hex(&bytes)),
        None => body.number("size", 0).string("data", ""),
    };
    Ok(Response::json(body.finish()))
}

fn write(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(addr), Some(data)) = (params.get_address("addr"), params.get_str("data")) else {
        return Ok(missing(&["addr", "data"]));
    };
    let Ok(bytes) = json::decode_hex(data) else {
        return Ok(Response::bad_request("Invalid hex in 'data' parameter"));
    };

    let written = host.memory_write(addr, &bytes)?;
    Ok(Response::json(
        JsonObject::new()
            .bool("success", written.success)
            .number("bytes_written", written.bytes_written)
            .finish(),
    ))
}
