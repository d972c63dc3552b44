//! Minimal JSON rendering for response bodies.
//!
//! # Design
//! Responses only ever contain flat objects, arrays of flat objects, strings,
//! booleans and integers, so bodies are assembled directly as text instead of
//! going through a serializer. Addresses are rendered as `0x`-prefixed hex
//! strings; byte buffers as unseparated lowercase hex pairs.

use std::fmt::{Display, Write};

use crate::error::HexError;

/// Escape text for use inside a JSON string literal.
///
/// Only `"`, `\`, newline, carriage return and tab are escaped; every other
/// character is copied through unchanged.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Render an address as `0x` followed by lowercase hex without leading zeros.
pub fn format_address(value: u64) -> String {
    format!("{value:#x}")
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Render bytes as lowercase hex pairs in order, with no separators.
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parse hex pairs back into bytes.
///
/// A trailing unpaired digit is ignored. Any non-hex digit is an error.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, HexError> {
    let paired = &text.as_bytes()[..text.len() & !1];
    hex::decode(paired).map_err(|err| match err {
        hex::FromHexError::InvalidHexCharacter { index, .. } => {
            HexError::InvalidDigit { position: index }
        }
        // the input is trimmed to an even length above
        _ => HexError::InvalidDigit {
            position: paired.len(),
        },
    })
}

/// Builder for a flat JSON object.
///
/// ```
/// use dbgbridge_core::json::JsonObject;
///
/// let body = JsonObject::new()
///     .bool("success", true)
///     .address("address", 0x401000)
///     .finish();
/// assert_eq!(body, r#"{"success":true,"address":"0x401000"}"#);
/// ```
#[derive(Debug, Default)]
pub struct JsonObject {
    buf: String,
}

impl JsonObject {
    pub fn new() -> Self {
        Self {
            buf: String::from("{"),
        }
    }

    fn key(&mut self, key: &str) {
        if self.buf.len() > 1 {
            self.buf.push(',');
        }
        self.buf.push('"');
        self.buf.push_str(&escape(key));
        self.buf.push_str("\":");
    }

    /// Add an escaped string field.
    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.key(key);
        self.buf.push('"');
        self.buf.push_str(&escape(value));
        self.buf.push('"');
        self
    }

    pub fn bool(mut self, key: &str, value: bool) -> Self {
        self.key(key);
        self.buf.push_str(format_bool(value));
        self
    }

    /// Add a bare numeric field.
    pub fn number(mut self, key: &str, value: impl Display) -> Self {
        self.key(key);
        let _ = write!(self.buf, "{value}");
        self
    }

    /// Add an address rendered as a `0x` hex string.
    pub fn address(self, key: &str, value: u64) -> Self {
        self.string(key, &format_address(value))
    }

    /// Add a field whose value is already valid JSON.
    pub fn raw(mut self, key: &str, json: &str) -> Self {
        self.key(key);
        self.buf.push_str(json);
        self
    }

    pub fn finish(mut self) -> String {
        self.buf.push('}');
        self.buf
    }
}

/// Join already-rendered JSON values into an array.
pub fn array<I>(items: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut out = String::from("[");
    for (index, item) in items.into_iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        out.push_str(&item);
    }
    out.push(']');
    out
}

/// Render a JSON array of strings.
pub fn string_array<'a, I>(items: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    array(items.into_iter().map(|s| format!("\"{}\"", escape(s))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_the_five_special_characters() {
        assert_eq!(escape("a\"b"), "a\\\"b");
        assert_eq!(escape("a\\b"), "a\\\\b");
        assert_eq!(escape("line\nnext"), "line\\nnext");
        assert_eq!(escape("cr\rlf"), "cr\\rlf");
        assert_eq!(escape("tab\there"), "tab\\there");
    }

    #[test]
    fn escape_passes_other_characters_through() {
        assert_eq!(escape("mov eax, [ebx+4]"), "mov eax, [ebx+4]");
        assert_eq!(escape("модуль.dll"), "модуль.dll");
        assert_eq!(escape("\u{1}"), "\u{1}");
    }

    #[test]
    fn format_address_has_no_leading_zeros() {
        assert_eq!(format_address(0), "0x0");
        assert_eq!(format_address(255), "0xff");
        assert_eq!(format_address(0x7ff6_1234_0000), "0x7ff612340000");
        assert_eq!(format_address(u64::MAX), "0xffffffffffffffff");
    }

    #[test]
    fn format_bool_literals() {
        assert_eq!(format_bool(true), "true");
        assert_eq!(format_bool(false), "false");
    }

    #[test]
    fn hex_roundtrip() {
        let samples: [&[u8]; 4] = [&[], &[0x00], &[0x90, 0xc3, 0xcc], &[0xde, 0xad, 0xbe, 0xef, 0x01]];
        for bytes in samples {
            let hex = encode_hex(bytes);
            assert_eq!(hex.len(), bytes.len() * 2);
            assert_eq!(decode_hex(&hex).unwrap(), bytes);
        }
    }

    #[test]
    fn decode_hex_accepts_uppercase_and_ignores_odd_tail() {
        assert_eq!(decode_hex("DEADbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode_hex("9090c").unwrap(), vec![0x90, 0x90]);
    }

    #[test]
    fn decode_hex_rejects_bad_digits() {
        assert_eq!(
            decode_hex("90zz").unwrap_err(),
            HexError::InvalidDigit { position: 2 }
        );
        assert_eq!(
            decode_hex("9g").unwrap_err(),
            HexError::InvalidDigit { position: 1 }
        );
        // a bad digit in the dropped tail is never looked at
        assert_eq!(decode_hex("90z").unwrap(), vec![0x90]);
        assert_eq!(decode_hex("z").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn object_builder_separates_fields() {
        let body = JsonObject::new()
            .string("name", "kernel32.dll")
            .number("size", 42)
            .bool("manual", false)
            .raw("results", "[]")
            .finish();
        assert_eq!(
            body,
            r#"{"name":"kernel32.dll","size":42,"manual":false,"results":[]}"#
        );
        assert_eq!(JsonObject::new().finish(), "{}");
    }

    #[test]
    fn arrays() {
        assert_eq!(array(Vec::new()), "[]");
        assert_eq!(array(vec!["1".to_string(), "2".to_string()]), "[1,2]");
        assert_eq!(string_array(["0x10", "a\"b"]), r#"["0x10","a\"b"]"#);
    }
}
