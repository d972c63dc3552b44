use super::missing;
use crate::host::{DebugHost, Register};
use crate::http::Response;
use crate::json::JsonObject;
use crate::params::Params;
use crate::router::{HandlerResult, Router};

pub(super) fn register(router: &mut Router) {
    router
        .route("/register/get", get)
        .route("/register/set", set);
}

fn unknown(name: &str) -> Response {
    Response::bad_request(format!("Unknown register: {name}"))
}

fn get(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(name) = params.get_str("name") else {
        return Ok(missing(&["name"]));
    };
    let Some(register) = Register::parse(name, host.arch()) else {
        return Ok(unknown(name));
    };
    let value = host.register_get(register)?;
    Ok(Response::json(
        JsonObject::new()
            .string("register", name)
            .address("value", value)
            .finish(),
    ))
}

fn set(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(name), Some(value)) = (params.get_str("name"), params.get_address("value")) else {
        return Ok(missing(&["name", "value"]));
    };
    let Some(register) = Register::parse(name, host.arch()) else {
        return Ok(unknown(name));
    };
    Ok(Response::success(host.register_set(register, value)?))
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{call, StubHost};
    use crate::http::StatusCode;

    #[test]
    fn get_renders_value_as_address() {
        let host = StubHost::default();
        let resp = call(&host, "/register/get?name=RAX");
        assert_eq!(resp.body, r#"{"register":"RAX","value":"0x1234"}"#);
        assert_eq!(host.calls(), ["register_get(rax)"]);
    }

    #[test]
    fn wide_register_on_x86_is_unknown() {
        let host = StubHost::x86();
        let resp = call(&host, "/register/get?name=rax");
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body, "Unknown register: rax");
        assert!(host.calls().is_empty());
    }

    #[test]
    fn set_parses_hex_value() {
        let host = StubHost::default();
        let resp = call(&host, "/register/set?name=rip&value=0x401000");
        assert_eq!(resp.body, r#"{"success":true}"#);
        assert_eq!(host.calls(), ["register_set(rip, 0x401000)"]);
    }

    #[test]
    fn set_without_value_never_reaches_host() {
        let host = StubHost::default();
        let resp = call(&host, "/register/set?name=rax");
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body, "Missing 'name' or 'value' parameter");
        assert!(host.calls().is_empty());
    }

    #[test]
    fn set_with_unparseable_value_is_400() {
        let host = StubHost::default();
        let resp = call(&host, "/register/set?name=rax&value=0xzz");
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn failed_set_reports_false() {
        let host = StubHost::failing();
        let resp = call(&host, "/register/set?name=eax&value=1");
        assert_eq!(resp.body, r#"{"success":false}"#);
    }
}
