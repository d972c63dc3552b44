use super::missing;
use crate::host::DebugHost;
use crate::http::Response;
use crate::json::JsonObject;
use crate::params::Params;
use crate::router::{HandlerResult, Router};

pub(super) fn register(router: &mut Router) {
    router
        .route("/stack/push", push)
        .route("/stack/pop", pop)
        .route("/stack/peek", peek);
}

fn push(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(value) = params.get_address("value") else {
        return Ok(missing(&["value"]));
    };
    let previous = host.stack_push(value)?;
    Ok(Response::json(
        JsonObject::new()
            .bool("success", true)
            .address("previous_top", previous)
            .finish(),
    ))
}

fn pop(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    let value = host.stack_pop()?;
    Ok(Response::json(
        JsonObject::new()
            .bool("success", true)
            .address("value", value)
            .finish(),
    ))
}

fn peek(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let offset = params.get_int("offset").unwrap_or(0);
    let value = host.stack_peek(offset)?;
    Ok(Response::json(
        JsonObject::new()
            .bool("success", true)
            .number("offset", offset)
            .address("value", value)
            .finish(),
    ))
}
