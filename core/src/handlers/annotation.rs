//! Symbols, labels and comments.
//!
//! Label and comment text is bounded by the host's fixed buffers; text that
//! would not fit is rejected with a 400 instead of being cut short.

use super::{missing, render_list};
use crate::host::{AnnotationInfo, CommentText, DebugHost, LabelText};
use crate::http::Response;
use crate::json::JsonObject;
use crate::params::Params;
use crate::router::{HandlerResult, Router};

pub(super) fn register(router: &mut Router) {
    router
        .route("/symbols/list", symbols)
        .route("/label/set", label_set)
        .route("/label/get", label_get)
        .route("/label/delete", label_delete)
        .route("/label/from_string", label_from_string)
        .route("/label/list", label_list)
        .route("/comment/set", comment_set)
        .route("/comment/get", comment_get)
        .route("/comment/delete", comment_delete)
        .route("/comment/from_string", comment_from_string)
        .route("/comment/list", comment_list);
}

fn symbols(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    Ok(render_list(host.symbols()?, "symbol", |s| {
        JsonObject::new()
            .string("module", &s.module)
            .address("rva", s.rva)
            .string("name", &s.name)
            .bool("manual", s.manual)
            .string("type", s.kind.as_str())
            .finish()
    }))
}

fn render_annotation(info: &AnnotationInfo) -> String {
    JsonObject::new()
        .string("module", &info.module)
        .address("rva", info.rva)
        .string("text", &info.text)
        .bool("manual", info.manual)
        .finish()
}

fn text_result(text: Option<&str>) -> Response {
    Response::json(
        JsonObject::new()
            .bool("success", text.is_some())
            .string("text", text.unwrap_or(""))
            .finish(),
    )
}

fn address_result(addr: Option<u64>) -> Response {
    Response::json(
        JsonObject::new()
            .bool("success", addr.is_some())
            .address("address", addr.unwrap_or(0))
            .finish(),
    )
}

fn too_long(err: impl std::fmt::Display) -> Response {
    Response::bad_request(format!("Invalid 'text' parameter: {err}"))
}

fn label_set(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(addr), Some(text)) = (params.get_address("addr"), params.get_bytes("text")) else {
        return Ok(missing(&["addr", "text"]));
    };
    if let Err(err) = LabelText::check(text) {
        return Ok(too_long(err));
    }
    let manual = params.get_bool("manual").unwrap_or(false);
    Ok(Response::success(host.label_set(addr, text, manual)?))
}

fn label_get(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(addr) = params.get_address("addr") else {
        return Ok(missing(&["addr"]));
    };
    let label = host.label_get(addr)?;
    Ok(text_result(label.as_deref()))
}

fn label_delete(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(addr) = params.get_address("addr") else {
        return Ok(missing(&["addr"]));
    };
    Ok(Response::success(host.label_delete(addr)?))
}

fn label_from_string(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(label) = params.get_bytes("label") else {
        return Ok(missing(&["label"]));
    };
    Ok(address_result(host.label_from_string(label)?))
}

fn label_list(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    Ok(render_list(host.labels()?, "label", render_annotation))
}

fn comment_set(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(addr), Some(text)) = (params.get_address("addr"), params.get_bytes("text")) else {
        return Ok(missing(&["addr", "text"]));
    };
    if let Err(err) = CommentText::check(text) {
        return Ok(too_long(err));
    }
    let manual = params.get_bool("manual").unwrap_or(false);
    Ok(Response::success(host.comment_set(addr, text, manual)?))
}

fn comment_get(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(addr) = params.get_address("addr") else {
        return Ok(missing(&["addr"]));
    };
    let comment = host.comment_get(addr)?;
    Ok(text_result(comment.as_deref()))
}

fn comment_delete(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(addr) = params.get_address("addr") else {
        return Ok(missing(&["addr"]));
    };
    Ok(Response::success(host.comment_delete(addr)?))
}

fn comment_from_string(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(text) = params.get_bytes("text") else {
        return Ok(missing(&["text"]));
    };
    Ok(address_result(host.comment_from_string(text)?))
}

fn comment_list(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    Ok(render_list(host.comments()?, "comment", render_annotation))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use crate::handlers::testing::{call, StubHost};
    use crate::http::StatusCode;

    #[test]
    fn symbols_render_kind_as_type() {
        let host = StubHost::default();
        let resp = call(&host, "/symbols/list");
        assert_eq!(
            resp.body,
            r#"[{"module":"app.exe","rva":"0x1000","name":"main","manual":false,"type":"export"}]"#
        );
        assert_eq!(host.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn label_set_defaults_to_automatic() {
        let host = StubHost::default();
        call(&host, "/label/set?addr=0x401000&text=entry+point");
        call(&host, "/label/set?addr=0x401000&text=entry&manual=yes");
        assert_eq!(
            host.calls(),
            [
                "label_set(0x401000, entry point, false)",
                "label_set(0x401000, entry, true)"
            ]
        );
    }

    #[test]
    fn label_set_rejects_text_beyond_buffer() {
        let host = StubHost::default();
        let long = "a".repeat(256);
        let resp = call(&host, &format!("/label/set?addr=1&text={long}"));
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(host.calls().is_empty());

        let fits = "a".repeat(255);
        let resp = call(&host, &format!("/label/set?addr=1&text={fits}"));
        assert_eq!(resp.body, r#"{"success":true}"#);
    }

    #[test]
    fn label_get_and_miss() {
        let host = StubHost::default();
        assert_eq!(
            call(&host, "/label/get?addr=0x401000").body,
            r#"{"success":true,"text":"entry"}"#
        );
        let host = StubHost::failing();
        assert_eq!(
            call(&host, "/label/get?addr=0x401000").body,
            r#"{"success":false,"text":""}"#
        );
    }

    #[test]
    fn comment_text_is_escaped() {
        let host = StubHost::default();
        assert_eq!(
            call(&host, "/comment/get?addr=1").body,
            r#"{"success":true,"text":"decrypts\tconfig"}"#
        );
    }

    #[test]
    fn comment_accepts_longer_text_than_label() {
        let host = StubHost::default();
        let text = "c".repeat(300);
        let resp = call(&host, &format!("/comment/set?addr=1&text={text}"));
        assert_eq!(resp.body, r#"{"success":true}"#);
    }

    #[test]
    fn from_string_lookups() {
        let host = StubHost::default();
        assert_eq!(
            call(&host, "/label/from_string?label=entry").body,
            r#"{"success":true,"address":"0x401000"}"#
        );
        assert_eq!(
            call(&host, "/comment/from_string?text=decrypts").body,
            r#"{"success":true,"address":"0x401010"}"#
        );
        assert_eq!(
            call(&host, "/label/from_string").body,
            "Missing 'label' parameter"
        );
    }

    #[test]
    fn empty_comment_list_still_releases() {
        let host = StubHost::default();
        assert_eq!(call(&host, "/comment/list").body, "[]");
        assert_eq!(call(&host, "/label/list").body.matches("module").count(), 1);
        assert_eq!(host.released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn set_requires_address_and_text() {
        let host = StubHost::default();
        assert_eq!(
            call(&host, "/comment/set?addr=1").body,
            "Missing 'addr' or 'text' parameter"
        );
    }
}
