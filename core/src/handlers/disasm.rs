use super::{missing, render_list};
use crate::host::DebugHost;
use crate::http::Response;
use crate::json::JsonObject;
use crate::params::Params;
use crate::router::{HandlerResult, Router};

pub(super) fn register(router: &mut Router) {
    router
        .route("/disasm", disasm)
        .route("/modules", modules);
}

fn disasm(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(addr) = params.get_address("addr") else {
        return Ok(missing(&["addr"]));
    };
    let instruction = host.disasm_at(addr)?;
    let (text, size) = instruction
        .as_ref()
        .map_or(("", 0), |i| (i.text.as_str(), i.size));
    Ok(Response::json(
        JsonObject::new()
            .bool("success", instruction.is_some())
            .address("address", addr)
            .string("instruction", text)
            .number("size", size)
            .finish(),
    ))
}

fn modules(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    Ok(render_list(host.modules()?, "module", |m| {
        JsonObject::new()
            .string("name", &m.name)
            .address("base", m.base)
            .address("size", m.size)
            .address("entry", m.entry)
            .string("path", &m.path)
            .finish()
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use crate::handlers::testing::{call, StubHost};
    use crate::http::StatusCode;

    #[test]
    fn disasm_escapes_instruction_text() {
        let host = StubHost::default();
        let resp = call(&host, "/disasm?addr=0x401000");
        assert_eq!(
            resp.body,
            r#"{"success":true,"address":"0x401000","instruction":"mov eax, \"x\"","size":5}"#
        );
    }

    #[test]
    fn undecodable_address() {
        let host = StubHost::failing();
        let resp = call(&host, "/disasm?addr=0");
        assert_eq!(
            resp.body,
            r#"{"success":false,"address":"0x0","instruction":"","size":0}"#
        );
    }

    #[test]
    fn modules_list_and_release() {
        let host = StubHost::default();
        let resp = call(&host, "/modules");
        assert_eq!(
            resp.body,
            r#"[{"name":"app.exe","base":"0x400000","size":"0x2000","entry":"0x401000","path":"C:\\app\\app.exe"}]"#
        );
        assert_eq!(host.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn modules_failure_is_500_text() {
        let host = StubHost::failing();
        let resp = call(&host, "/modules");
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body, "Failed to get module list");
    }
}
