//! HTTP wire types: request parsing and response rendering.
//!
//! # Design
//! Requests arrive as one bounded byte buffer per connection. Only the
//! request line, the query string and the body are interpreted; headers are
//! ignored. Responses are always fully buffered and always close the
//! connection, so rendering produces the complete byte sequence in one go.

use std::borrow::Cow;

use percent_encoding::percent_decode;

use crate::json::{self, JsonObject};
use crate::params::Params;

/// A parsed request. Lives for exactly one request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    pub params: Params,
    pub body: Vec<u8>,
}

impl Request {
    /// Parse a raw request buffer.
    ///
    /// Returns `None` when the request line is malformed; such a request
    /// must not be dispatched.
    pub fn parse(buffer: &[u8]) -> Option<Self> {
        let line = parse_request_line(buffer)?;
        Some(Self {
            method: line.method.into_owned(),
            path: line.path.into_owned(),
            params: decode_query(&line.query),
            body: extract_body(buffer).to_vec(),
        })
    }
}

/// The three components of a request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: Cow<'a, str>,
    pub path: Cow<'a, str>,
    pub query: Cow<'a, str>,
}

/// Split the first line of `buffer` on its first two spaces.
///
/// The target between the spaces is split again on the first `?` into
/// path and query. Fails when the line has no `\r\n` terminator or either
/// space is missing.
pub fn parse_request_line(buffer: &[u8]) -> Option<RequestLine<'_>> {
    let line_end = find(buffer, b"\r\n")?;
    let line = &buffer[..line_end];

    let method_end = line.iter().position(|&b| b == b' ')?;
    let rest = &line[method_end + 1..];
    let target_end = rest.iter().position(|&b| b == b' ')?;
    let target = &rest[..target_end];

    let (path, query) = match target.iter().position(|&b| b == b'?') {
        Some(q) => (&target[..q], &target[q + 1..]),
        None => (target, &target[target.len()..]),
    };

    Some(RequestLine {
        method: String::from_utf8_lossy(&line[..method_end]),
        path: String::from_utf8_lossy(path),
        query: String::from_utf8_lossy(query),
    })
}

/// Decode a query string into parameters.
///
/// Pairs are separated by `&` and split on their first `=`; a pair without
/// `=` is skipped. Keys and values are percent-decoded with `+` meaning a
/// space. A `%` not followed by two hex digits is kept as-is. Values keep
/// the decoded bytes exactly; keys are read as text.
pub fn decode_query(query: &str) -> Params {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| {
            let key = String::from_utf8_lossy(&url_decode(key)).into_owned();
            (key, url_decode(value))
        })
        .collect()
}

/// Percent-decode one query component, treating `+` as a space.
///
/// `%XX` yields the byte `0xXX` whether or not the result is valid UTF-8.
pub fn url_decode(component: &str) -> Vec<u8> {
    let spaced = component.replace('+', " ");
    percent_decode(spaced.as_bytes()).collect()
}

/// Everything after the first blank line, or nothing.
pub fn extract_body(buffer: &[u8]) -> &[u8] {
    match find(buffer, b"\r\n\r\n") {
        Some(pos) => &buffer[pos + 4..],
        None => &[],
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// A numeric HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Reason phrase; every code other than 200/400/404 reads as a server error.
    pub fn reason_phrase(self) -> &'static str {
        match self.0 {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            _ => "Internal Server Error",
        }
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }
}

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn new(status: StatusCode, content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    /// 200 with a JSON body.
    pub fn json(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, CONTENT_TYPE_JSON, body)
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, CONTENT_TYPE_TEXT, body)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::text(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::text(StatusCode::NOT_FOUND, "Endpoint not found")
    }

    /// 500 with a JSON body carrying the fault description.
    pub fn fault(message: &str) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            CONTENT_TYPE_JSON,
            JsonObject::new().string("error", message).finish(),
        )
    }

    /// `{"success": <ok>}`
    pub fn success(ok: bool) -> Self {
        Self::json(format!("{{\"success\":{}}}", json::format_bool(ok)))
    }

    /// Render status line, headers, blank line and body.
    pub fn render(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Connection: close\r\n\r\n",
            self.status.0,
            self.status.reason_phrase(),
            self.content_type,
            self.body.len(),
        );
        let mut out = Vec::with_capacity(head.len() + self.body.len());
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(self.body.as_bytes());
        out
    }
}
