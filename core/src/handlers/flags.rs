use super::missing;
use crate::host::{DebugHost, Flag};
use crate::http::Response;
use crate::json::JsonObject;
use crate::params::Params;
use crate::router::{HandlerResult, Router};

pub(super) fn register(router: &mut Router) {
    router
        .route("/flag/get", get)
        .route("/flag/set", set)
        .route("/flags/get_all", get_all);
}

fn invalid_flag() -> Response {
    Response::bad_request("Invalid flag name (use: ZF, OF, CF, PF, SF, TF, AF, DF, IF)")
}

fn get(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(name) = params.get_str("flag") else {
        return Ok(missing(&["flag"]));
    };
    let Some(flag) = Flag::parse(name) else {
        return Ok(invalid_flag());
    };
    let value = host.flag_get(flag)?;
    Ok(Response::json(
        JsonObject::new()
            .string("flag", name)
            .bool("value", value)
            .finish(),
    ))
}

fn set(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(name), Some(value)) = (params.get_str("flag"), params.get_bool("value")) else {
        return Ok(missing(&["flag", "value"]));
    };
    let Some(flag) = Flag::parse(name) else {
        return Ok(invalid_flag());
    };
    Ok(Response::success(host.flag_set(flag, value)?))
}

fn get_all(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    let mut body = JsonObject::new();
    for &flag in Flag::ALL {
        body = body.bool(&flag.label(), host.flag_get(flag)?);
    }
    Ok(Response::json(body.finish()))
}
