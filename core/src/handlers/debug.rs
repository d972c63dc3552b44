//! Execution control and breakpoints.

use super::missing;
use crate::host::DebugHost;
use crate::http::Response;
use crate::params::Params;
use crate::router::{HandlerResult, Router};

pub(super) fn register(router: &mut Router) {
    router
        .route("/debug/run", run)
        .route("/debug/pause", pause)
        .route("/debug/step", step_in)
        .route("/debug/stepover", step_over)
        .route("/debug/stepout", step_out)
        .route("/breakpoint/set", breakpoint_set)
        .route("/breakpoint/delete", breakpoint_delete);
}

fn run(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    Ok(Response::success(host.run()?))
}

fn pause(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    Ok(Response::success(host.pause()?))
}

fn step_in(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    Ok(Response::success(host.step_in()?))
}

fn step_over(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    Ok(Response::success(host.step_over()?))
}

fn step_out(host: &dyn DebugHost, _: &Params) -> HandlerResult {
    Ok(Response::success(host.step_out()?))
}

fn breakpoint_set(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(addr) = params.get_address("addr") else {
        return Ok(missing(&["addr"]));
    };
    Ok(Response::success(host.breakpoint_set(addr)?))
}

fn breakpoint_delete(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let Some(addr) = params.get_address("addr") else {
        return Ok(missing(&["addr"]));
    };
    Ok(Response::success(host.breakpoint_delete(addr)?))
}
