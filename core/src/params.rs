//! Query-string parameters with typed accessors.
//!
//! Every accessor fails closed: a missing key and a value that does not parse
//! both come back as `None`, and handlers answer either with a 400.
//!
//! Values are stored as the exact bytes the query decoded to. Free text that
//! is passed on to the host is read with [`Params::get_bytes`]; the typed
//! accessors go through the UTF-8 view of [`Params::get_str`].

use std::collections::HashMap;

/// Decoded key/value pairs of one request's query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, Vec<u8>>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair; a repeated key keeps the last value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw decoded bytes of a value.
    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.values.get(key).map(Vec::as_slice)
    }

    /// The value as text; `None` when absent or not valid UTF-8.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get_bytes(key)
            .and_then(|value| std::str::from_utf8(value).ok())
    }

    /// Unsigned 64-bit value with C-style radix prefixes (`0x` hex, `0` octal).
    pub fn get_address(&self, key: &str) -> Option<u64> {
        self.get_str(key).and_then(parse_unsigned)
    }

    /// Signed 32-bit value with the same radix rules as [`Params::get_address`].
    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get_str(key).and_then(parse_signed)
    }

    /// `Some(true)` for `true`, `1` or `yes`; `Some(false)` for any other
    /// present value; `None` when the key is absent.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_bytes(key)
            .map(|value| matches!(value, b"true" | b"1" | b"yes"))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Parse an unsigned integer honoring `0x`/`0X` and leading-`0` prefixes.
pub fn parse_unsigned(text: &str) -> Option<u64> {
    let (digits, radix) = split_radix(text);
    if digits.is_empty() {
        return None;
    }
    // from_str_radix tolerates a leading '+', the prefix rules do not
    if digits.starts_with('+') {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

/// Parse a signed 32-bit integer with an optional sign before the prefix.
pub fn parse_signed(text: &str) -> Option<i32> {
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = i64::try_from(parse_unsigned(rest)?).ok()?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).ok()
}

fn split_radix(text: &str) -> (&str, u32) {
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().copied().collect()
    }

    #[test]
    fn get_str_present_and_absent() {
        let p = params(&[("cmd", "bp 0x401000")]);
        assert_eq!(p.get_str("cmd"), Some("bp 0x401000"));
        assert_eq!(p.get_str("missing"), None);
    }

    #[test]
    fn bytes_survive_without_a_text_view() {
        let mut p = Params::new();
        p.insert("text", b"caf\xe9".to_vec());
        assert_eq!(p.get_bytes("text"), Some(&b"caf\xe9"[..]));
        assert_eq!(p.get_str("text"), None);
        assert_eq!(p.get_address("text"), None);
        // present but unreadable is still present
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn address_radix_prefixes() {
        let p = params(&[
            ("hex", "0x401000"),
            ("upper", "0XFF"),
            ("dec", "4096"),
            ("oct", "010"),
            ("zero", "0"),
        ]);
        assert_eq!(p.get_address("hex"), Some(0x401000));
        assert_eq!(p.get_address("upper"), Some(255));
        assert_eq!(p.get_address("dec"), Some(4096));
        assert_eq!(p.get_address("oct"), Some(8));
        assert_eq!(p.get_address("zero"), Some(0));
    }

    #[test]
    fn address_fails_closed() {
        let p = params(&[
            ("junk", "hello"),
            ("empty", ""),
            ("bare_prefix", "0x"),
            ("trailing", "12abc"),
            ("negative", "-1"),
            ("plus", "+5"),
            ("bad_octal", "09"),
            ("overflow", "0x1ffffffffffffffff"),
        ]);
        for key in [
            "junk",
            "empty",
            "bare_prefix",
            "trailing",
            "negative",
            "plus",
            "bad_octal",
            "overflow",
            "missing",
        ] {
            assert_eq!(p.get_address(key), None, "{key}");
        }
    }

    #[test]
    fn int_accepts_sign_and_radix() {
        let p = params(&[
            ("pos", "16"),
            ("neg", "-8"),
            ("hex", "0x10"),
            ("neg_hex", "-0x10"),
            ("plus", "+3"),
            ("max", "2147483647"),
            ("min", "-2147483648"),
        ]);
        assert_eq!(p.get_int("pos"), Some(16));
        assert_eq!(p.get_int("neg"), Some(-8));
        assert_eq!(p.get_int("hex"), Some(16));
        assert_eq!(p.get_int("neg_hex"), Some(-16));
        assert_eq!(p.get_int("plus"), Some(3));
        assert_eq!(p.get_int("max"), Some(i32::MAX));
        assert_eq!(p.get_int("min"), Some(i32::MIN));
    }

    #[test]
    fn int_rejects_out_of_range_and_junk() {
        let p = params(&[("big", "2147483648"), ("junk", "ten"), ("sign_only", "-")]);
        assert_eq!(p.get_int("big"), None);
        assert_eq!(p.get_int("junk"), None);
        assert_eq!(p.get_int("sign_only"), None);
        assert_eq!(p.get_int("missing"), None);
    }

    #[test]
    fn bool_truthy_values() {
        let p = params(&[("a", "true"), ("b", "1"), ("c", "yes")]);
        assert_eq!(p.get_bool("a"), Some(true));
        assert_eq!(p.get_bool("b"), Some(true));
        assert_eq!(p.get_bool("c"), Some(true));
    }

    #[test]
    fn bool_everything_else_is_false_and_absent_is_none() {
        let p = params(&[("a", "false"), ("b", "0"), ("c", ""), ("d", "TRUE"), ("e", "on")]);
        for key in ["a", "b", "c", "d", "e"] {
            assert_eq!(p.get_bool(key), Some(false), "{key}");
        }
        assert_eq!(p.get_bool("missing"), None);
        assert!(!p.get_bool("missing").unwrap_or(false));
    }

    #[test]
    fn repeated_key_keeps_last_value() {
        let p = params(&[("addr", "1"), ("addr", "2")]);
        assert_eq!(p.len(), 1);
        assert_eq!(p.get_address("addr"), Some(2));
    }
}
