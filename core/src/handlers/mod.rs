//! Request handlers, one module per capability domain.
//!
//! Every handler follows the same linear shape: pull its required
//! parameters (400 if any is missing or unparseable), call the host, render
//! the result. Handlers keep no state between requests.

mod annotation;
mod assembler;
mod control;
mod debug;
mod disasm;
mod flags;
mod function;
mod memory;
mod misc;
mod pattern;
mod registers;
mod stack;

#[cfg(test)]
pub(crate) mod testing;

pub use control::API_VERSION;
pub use memory::MAX_MEMORY_READ;
pub use pattern::DEFAULT_SEARCH_RESULTS;

use crate::host::HostList;
use crate::http::{Response, StatusCode};
use crate::json;
use crate::router::Router;

/// Register every route of the API surface.
pub(crate) fn register(router: &mut Router) {
    control::register(router);
    registers::register(router);
    memory::register(router);
    pattern::register(router);
    debug::register(router);
    disasm::register(router);
    annotation::register(router);
    stack::register(router);
    function::register(router);
    misc::register(router);
    assembler::register(router);
    flags::register(router);
}

/// 400 naming the required parameters, e.g. `Missing 'addr' or 'size' parameter`.
pub(crate) fn missing(names: &[&str]) -> Response {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
    let list = match quoted.as_slice() {
        [] => String::new(),
        [one] => one.clone(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    };
    Response::bad_request(format!("Missing {list} parameter"))
}

/// Serialize a host list into a JSON array, then hand the buffer back.
///
/// A host that could not produce the list gets a 500 text response.
pub(crate) fn render_list<T>(
    list: Option<HostList<T>>,
    what: &str,
    render: impl Fn(&T) -> String,
) -> Response {
    let Some(list) = list else {
        return Response::text(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to get {what} list"),
        );
    };
    let body = json::array(list.iter().map(render));
    drop(list);
    Response::json(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_message_lists_parameters() {
        assert_eq!(missing(&["cmd"]).body, "Missing 'cmd' parameter");
        assert_eq!(
            missing(&["name", "value"]).body,
            "Missing 'name' or 'value' parameter"
        );
        assert_eq!(
            missing(&["start", "size", "pattern"]).body,
            "Missing 'start', 'size', or 'pattern' parameter"
        );
        assert_eq!(missing(&["cmd"]).status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn failed_list_is_500_text() {
        let resp = render_list::<u64>(None, "module", |_| String::new());
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.content_type, "text/plain");
        assert_eq!(resp.body, "Failed to get module list");
    }

    #[test]
    fn list_renders_array() {
        let list = HostList::owned(vec![1u64, 2]);
        let resp = render_list(Some(list), "number", |n| n.to_string());
        assert_eq!(resp.body, "[1,2]");
    }
}
