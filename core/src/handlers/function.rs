//! Function ranges and bookmarks.

use super::{missing, render_list};
use crate::host::DebugHost;
use crate::http::Response;
use crate::json::JsonObject;
use crate::params::Params;
use crate::router::{HandlerResult, Router};

pub(super) fn register(router: &mut Router) {
    router
        .route("/function/add", function_add)
        .route("/function/get", function_get)
        .route("/function/delete", function_delete)
        .route("/function/list", function_list)
        .route("/bookmark/add", bookmark_set)
        .route("/bookmark/set", bookmark_set)
        .route("/bookmark/get", bookmark_get)
        .route("/bookmark/delete", bookmark_delete)
        .route("/bookmark/list", bookmark_list);
}

fn function_add(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(start), Some(end)) = (params.get_address("start"), params.get_address("end")) else {
        return Ok(missing(&["start", "end"]));
    };
    let manual = params.get_bool("manual").unwrap_or(false);
    let count = params.get_int("instruction_count").unwrap_or(0).max(0) as u64;
    Ok(Response::success(host.function_add(start, end, manual, count)?))
}

fn function_get(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(addr) = params.get_address("addr") else {
        return Ok(missing(&["addr"]));
    };
    let range = host.function_get(addr)?;
    let found = range.is_some();
    let range = range.unwrap_or_default();
    Ok(Response::json(
        JsonObject::new()
            .bool("success", found)
            .address("start", range.start)
            .address("end", range.end)
            .number("instruction_count", range.instruction_count)
            .finish(),
    ))
}

fn function_delete(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(addr) = params.get_address("addr") else {
        return Ok(missing(&["addr"]));
    };
    Ok(Response::success(host.function_delete(addr)?))
}

fn function_list(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    Ok(render_list(host.functions()?, "function", |f| {
        JsonObject::new()
            .string("module", &f.module)
            .address("rva_start", f.rva_start)
            .address("rva_end", f.rva_end)
            .bool("manual", f.manual)
            .number("instruction_count", f.instruction_count)
            .finish()
    }))
}

fn bookmark_set(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(addr) = params.get_address("addr") else {
        return Ok(missing(&["addr"]));
    };
    let manual = params.get_bool("manual").unwrap_or(false);
    Ok(Response::success(host.bookmark_set(addr, manual)?))
}

fn bookmark_get(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(addr) = params.get_address("addr") else {
        return Ok(missing(&["addr"]));
    };
    let exists = host.bookmark_get(addr)?;
    Ok(Response::json(JsonObject::new().bool("exists", exists).finish()))
}

fn bookmark_delete(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(addr) = params.get_address("addr") else {
        return Ok(missing(&["addr"]));
    };
    Ok(Response::success(host.bookmark_delete(addr)?))
}

fn bookmark_list(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    Ok(render_list(host.bookmarks()?, "bookmark", |b| {
        JsonObject::new()
            .string("module", &b.module)
            .address("rva", b.rva)
            .bool("manual", b.manual)
            .finish()
    }))
}
