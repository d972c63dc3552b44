use super::missing;
use crate::host::{DebugHost, MAX_INSTRUCTION_BYTES};
use crate::http::Response;
use crate::json::{self, JsonObject};
use crate::params::Params;
use crate::router::{HandlerResult, Router};

pub(super) fn register(router: &mut Router) {
    router
        .route("/assembler/assemble", assemble)
        .route("/assembler/assemble_mem", assemble_mem);
}

fn assemble(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(addr), Some(instruction)) = (params.get_address("addr"), params.get_bytes("instruction"))
    else {
        return Ok(missing(&["addr", "instruction"]));
    };
    let mut bytes = host.assemble(addr, instruction)?;
    if let Some(bytes) = bytes.as_mut() {
        bytes.truncate(MAX_INSTRUCTION_BYTES);
    }
    let bytes = bytes.as_deref();
    Ok(Response::json(
        JsonObject::new()
            .bool("success", bytes.is_some())
            .number("size", bytes.map_or(0, <[u8]>::len))
            .string("bytes", &json::encode_hex(bytes.unwrap_or_default()))
            .finish(),
    ))
}

fn assemble_mem(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(addr), Some(instruction)) = (params.get_address("addr"), params.get_bytes("instruction"))
    else {
        return Ok(missing(&["addr", "instruction"]));
    };
    Ok(Response::success(host.assemble_mem(addr, instruction)?))
}
