use super::missing;
use crate::host::DebugHost;
use crate::http::Response;
use crate::json::{self, JsonObject};
use crate::params::Params;
use crate::router::{HandlerResult, Router};

/// Result cap for `/memory/search` when `max` is not given.
pub const DEFAULT_SEARCH_RESULTS: i32 = 100;

pub(super) fn register(router: &mut Router) {
    router
        .route("/pattern/find_mem", find_mem)
        .route("/pattern/search_replace_mem", search_replace_mem)
        .route("/memory/search", search);
}

fn find_mem(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(start), Some(size), Some(pattern)) = (
        params.get_address("start"),
        params.get_address("size"),
        params.get_str("pattern"),
    ) else {
        return Ok(missing(&["start", "size", "pattern"]));
    };

    let found = host.pattern_find(start, size, pattern)?;
    Ok(Response::json(
        JsonObject::new()
            .bool("found", found.is_some())
            .address("address", found.unwrap_or(0))
            .finish(),
    ))
}

fn search_replace_mem(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(start), Some(size), Some(search), Some(replace)) = (
        params.get_address("start"),
        params.get_address("size"),
        params.get_str("search"),
        params.get_str("replace"),
    ) else {
        return Ok(missing(&["start", "size", "search", "replace"]));
    };
    Ok(Response::success(
        host.pattern_search_replace(start, size, search, replace)?,
    ))
}

/// Repeated `pattern_find`, resuming one byte past each hit.
fn search(host: &dyn DebugHost, params: &Params) -> HandlerResult {
    let (Some(start), Some(size), Some(pattern)) = (
        params.get_address("start"),
        params.get_address("size"),
        params.get_str("pattern"),
    ) else {
        return Ok(missing(&["start", "size", "pattern"]));
    };
    let max = params
        .get_int("max")
        .unwrap_or(DEFAULT_SEARCH_RESULTS)
        .max(0) as usize;

    let end = start.saturating_add(size);
    let mut cursor = start;
    let mut results = Vec::new();
    while cursor < end && results.len() < max {
        let Some(found) = host.pattern_find(cursor, end - cursor, pattern)? else {
            break;
        };
        // a hit behind the cursor would loop forever
        if found < cursor {
            break;
        }
        results.push(json::format_address(found));
        cursor = found.saturating_add(1);
    }

    Ok(Response::json(
        JsonObject::new()
            .number("count", results.len())
            .raw("results", &json::string_array(results.iter().map(String::as_str)))
            .finish(),
    ))
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{call, StubHost};
    use crate::http::StatusCode;

    #[test]
    fn find_reports_first_hit() {
        let host = StubHost::default();
        let resp = call(&host, "/pattern/find_mem?start=0x1001&size=0x100&pattern=90+90");
        assert_eq!(resp.body, r#"{"found":true,"address":"0x1010"}"#);
        assert_eq!(host.calls(), ["pattern_find(0x1001, 0x100, 90 90)"]);
    }

    #[test]
    fn find_miss_reports_zero_address() {
        let host = StubHost::failing();
        let resp = call(&host, "/pattern/find_mem?start=0&size=16&pattern=CC");
        assert_eq!(resp.body, r#"{"found":false,"address":"0x0"}"#);
    }

    #[test]
    fn find_names_all_required_parameters() {
        let host = StubHost::default();
        let resp = call(&host, "/pattern/find_mem?start=0");
        assert_eq!(resp.body, "Missing 'start', 'size', or 'pattern' parameter");
    }

    #[test]
    fn search_replace_passes_both_patterns() {
        let host = StubHost::default();
        let resp = call(
            &host,
            "/pattern/search_replace_mem?start=0x10&size=0x20&search=74+05&replace=EB+05",
        );
        assert_eq!(resp.body, r#"{"success":true}"#);
        assert_eq!(
            host.calls(),
            ["pattern_search_replace(0x10, 0x20, 74 05, EB 05)"]
        );
    }

    #[test]
    fn search_collects_every_hit_in_range() {
        let host = StubHost::default();
        let resp = call(&host, "/memory/search?start=0x1000&size=0x40&pattern=90");
        assert_eq!(
            resp.body,
            r#"{"count":4,"results":["0x1000","0x1010","0x1020","0x1030"]}"#
        );
    }

    #[test]
    fn search_honours_max() {
        let host = StubHost::default();
        let resp = call(&host, "/memory/search?start=0x1000&size=0x40&pattern=90&max=2");
        assert_eq!(resp.body, r#"{"count":2,"results":["0x1000","0x1010"]}"#);
        assert_eq!(host.calls().len(), 2);
    }

    #[test]
    fn search_with_non_positive_max_finds_nothing() {
        let host = StubHost::default();
        let resp = call(&host, "/memory/search?start=0&size=0x40&pattern=90&max=-1");
        assert_eq!(resp.body, r#"{"count":0,"results":[]}"#);
        assert!(host.calls().is_empty());
    }

    #[test]
    fn search_range_end_saturates() {
        let host = StubHost::failing();
        let resp = call(
            &host,
            "/memory/search?start=0xfffffffffffffff0&size=0x100&pattern=90",
        );
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(
            host.calls(),
            ["pattern_find(0xfffffffffffffff0, 0xf, 90)"]
        );
    }
}
