//! Route table and the single dispatch boundary.
//!
//! # Design
//! Routes map a path to a plain function pointer and are registered once,
//! when the server starts; the table is never mutated afterwards. The method
//! is not part of the key. `dispatch` is the only place where handler
//! faults and panics are caught, so one bad request can never take the
//! connection loop down with it.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error};

use crate::error::HostFault;
use crate::handlers;
use crate::host::DebugHost;
use crate::http::{Request, Response};
use crate::params::Params;

pub type HandlerResult = Result<Response, HostFault>;

/// A handler validates its parameters, calls the host and renders a response.
pub type Handler = fn(&dyn DebugHost, &Params) -> HandlerResult;

/// Static path → handler mapping.
#[derive(Clone)]
pub struct Router {
    routes: HashMap<&'static str, Handler>,
}

impl Router {
    /// The full route surface.
    pub fn new() -> Self {
        let mut router = Self::empty();
        handlers::register(&mut router);
        router
    }

    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    pub fn route(&mut self, path: &'static str, handler: Handler) -> &mut Self {
        self.routes.insert(path, handler);
        self
    }

    pub fn lookup(&self, path: &str) -> Option<Handler> {
        self.routes.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered paths in sorted order.
    pub fn paths(&self) -> Vec<&'static str> {
        let mut paths: Vec<_> = self.routes.keys().copied().collect();
        paths.sort_unstable();
        paths
    }

    /// Route a request and turn every outcome into a response.
    pub fn dispatch(&self, host: &dyn DebugHost, request: &Request) -> Response {
        let Some(handler) = self.lookup(&request.path) else {
            debug!(method = %request.method, path = %request.path, "no route");
            return Response::not_found();
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| handler(host, &request.params)));
        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(fault)) => {
                error!(path = %request.path, error = %fault, "capability fault");
                Response::fault(fault.message())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(path = %request.path, error = %message, "handler panicked");
                Response::fault(&message)
            }
        };
        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status.as_u16(),
            "request served"
        );
        response
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.paths())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::StubHost;
    use crate::http::StatusCode;

    fn request(path: &str) -> Request {
        Request::parse(format!("GET {path} HTTP/1.1\r\n\r\n").as_bytes()).unwrap()
    }

    fn always_ok(_: &dyn DebugHost, _: &Params) -> HandlerResult {
        Ok(Response::success(true))
    }

    fn always_fault(_: &dyn DebugHost, _: &Params) -> HandlerResult {
        Err(HostFault::new("host exploded"))
    }

    fn always_panic(_: &dyn DebugHost, _: &Params) -> HandlerResult {
        panic!("index out of range")
    }

    #[test]
    fn unknown_path_is_404_text() {
        let router = Router::new();
        let resp = router.dispatch(&StubHost::default(), &request("/nonexistent"));
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.content_type, "text/plain");
        assert_eq!(resp.body, "Endpoint not found");
    }

    #[test]
    fn query_string_is_not_part_of_the_route() {
        let mut router = Router::empty();
        router.route("/ok", always_ok);
        let resp = router.dispatch(&StubHost::default(), &request("/ok?x=1"));
        assert_eq!(resp.status, StatusCode::OK);
    }

    #[test]
    fn method_is_not_discriminated() {
        let mut router = Router::empty();
        router.route("/ok", always_ok);
        let req = Request::parse(b"DELETE /ok HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(router.dispatch(&StubHost::default(), &req).status, StatusCode::OK);
    }

    #[test]
    fn host_fault_becomes_500_json() {
        let mut router = Router::empty();
        router.route("/boom", always_fault);
        let resp = router.dispatch(&StubHost::default(), &request("/boom"));
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.content_type, "application/json");
        assert_eq!(resp.body, r#"{"error":"host exploded"}"#);
    }

    #[test]
    fn handler_panic_becomes_500_json() {
        let mut router = Router::empty();
        router.route("/panic", always_panic);
        let resp = router.dispatch(&StubHost::default(), &request("/panic"));
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body, r#"{"error":"index out of range"}"#);
    }

    #[test]
    fn full_surface_is_registered() {
        let router = Router::new();
        for path in [
            "/status",
            "/cmd",
            "/register/get",
            "/register/set",
            "/memory/read",
            "/memory/write",
            "/memory/search",
            "/pattern/find_mem",
            "/pattern/search_replace_mem",
            "/debug/run",
            "/debug/pause",
            "/debug/step",
            "/debug/stepover",
            "/debug/stepout",
            "/breakpoint/set",
            "/breakpoint/delete",
            "/disasm",
            "/modules",
            "/symbols/list",
            "/label/set",
            "/label/get",
            "/label/delete",
            "/label/list",
            "/label/from_string",
            "/comment/set",
            "/comment/get",
            "/comment/delete",
            "/comment/list",
            "/comment/from_string",
            "/stack/push",
            "/stack/pop",
            "/stack/peek",
            "/function/add",
            "/function/get",
            "/function/delete",
            "/function/list",
            "/bookmark/add",
            "/bookmark/set",
            "/bookmark/get",
            "/bookmark/delete",
            "/bookmark/list",
            "/misc/parse_expression",
            "/misc/resolve_label",
            "/misc/get_proc_address",
            "/assembler/assemble",
            "/assembler/assemble_mem",
            "/flag/get",
            "/flag/set",
            "/flags/get_all",
        ] {
            assert!(router.lookup(path).is_some(), "{path} not registered");
        }
        assert_eq!(router.len(), 49);
    }
}
