//! Expression evaluation and symbol resolution.

use super::missing;
use crate::host::DebugHost;
use crate::http::Response;
use crate::json::JsonObject;
use crate::params::Params;
use crate::router::{HandlerResult, Router};

pub(super) fn register(router: &mut Router) {
    router
        .route("/misc/parse_expression", parse_expression)
        .route("/misc/resolve_label", resolve_label)
        .route("/misc/get_proc_address", get_proc_address);
}

fn parse_expression(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(expression) = params.get_bytes("expr") else {
        return Ok(missing(&["expr"]));
    };
    let value = host.parse_expression(expression)?;
    Ok(Response::json(
        JsonObject::new()
            .bool("success", value.is_some())
            .string("expression", &String::from_utf8_lossy(expression))
            .address("value", value.unwrap_or(0))
            .finish(),
    ))
}

fn resolve_label(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(label) = params.get_bytes("label") else {
        return Ok(missing(&["label"]));
    };
    let addr = host.resolve_label(label)?;
    Ok(Response::json(
        JsonObject::new()
            .bool("success", addr.is_some())
            .string("label", &String::from_utf8_lossy(label))
            .address("address", addr.unwrap_or(0))
            .finish(),
    ))
}

fn get_proc_address(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(module), Some(api)) = (params.get_bytes("module"), params.get_bytes("api")) else {
        return Ok(missing(&["module", "api"]));
    };
    let addr = host.get_proc_address(module, api)?;
    Ok(Response::json(
        JsonObject::new()
            .bool("success", addr.is_some())
            .string("module", &String::from_utf8_lossy(module))
            .string("api", &String::from_utf8_lossy(api))
            .address("address", addr.unwrap_or(0))
            .finish(),
    ))
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{call, StubHost};

    #[test]
    fn expression_keeps_encoded_plus() {
        let host = StubHost::default();
        assert_eq!(
            call(&host, "/misc/parse_expression?expr=rip%2B8").body,
            r#"{"success":true,"expression":"rip+8","value":"0x401008"}"#
        );
    }

    #[test]
    fn unresolvable_label() {
        let host = StubHost::failing();
        assert_eq!(
            call(&host, "/misc/resolve_label?label=nowhere").body,
            r#"{"success":false,"label":"nowhere","address":"0x0"}"#
        );
    }

    #[test]
    fn proc_address_needs_module_and_api() {
        let host = StubHost::default();
        assert_eq!(
            call(&host, "/misc/get_proc_address?module=kernel32.dll").body,
            "Missing 'module' or 'api' parameter"
        );
        assert_eq!(
            call(&host, "/misc/get_proc_address?module=kernel32.dll&api=VirtualAlloc").body,
            r#"{"success":true,"module":"kernel32.dll","api":"VirtualAlloc","address":"0x7ff000001000"}"#
        );
    }
}
