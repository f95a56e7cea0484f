//! Helpers for reading loosely typed JSON request bodies.
//!
//! Field checks follow the semantics clients were written against: a
//! required field is "present" when it is truthy (not null, false, 0 or the
//! empty string), and optional fields fall back to a default only when absent
//! or null.

use axum::body::{to_bytes, Body};
use bytes::Bytes;
use serde_json::Value;

/// Buffer a request body, failing once it exceeds `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, axum::Error> {
    to_bytes(body, limit).await
}

/// Parse a request body as JSON; empty or malformed input yields `None`.
pub fn parse_json(bytes: &[u8]) -> Option<Value> {
    serde_json::from_slice(bytes).ok()
}

/// Truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The field `key` of `body` if it is truthy.
pub fn present<'a>(body: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    body?.get(key).filter(|v| is_truthy(v))
}

/// The field `key` of `body` as a non-empty string.
pub fn present_str<'a>(body: Option<&'a Value>, key: &str) -> Option<&'a str> {
    present(body, key)?.as_str()
}

/// The field `key` of `body`, or `default` when it is absent or null.
pub fn or_default(body: Option<&Value>, key: &str, default: Value) -> Value {
    match body.and_then(|b| b.get(key)) {
        None | Some(Value::Null) => default,
        Some(value) => value.clone(),
    }
}

/// An identifier returned by the backend as text; ids may be strings or numbers.
pub fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Leading integer of `input`, parsed the way lenient clients expect:
/// leading whitespace and a sign are allowed and trailing garbage is ignored
/// (`"12abc"` is 12). Values outside the `i64` range saturate. No digits
/// yields `None`.
pub fn parse_int_prefix(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let value = digits[..end].bytes().fold(0i64, |acc, b| {
        let digit = i64::from(b - b'0');
        let acc = acc.saturating_mul(10);
        if negative {
            acc.saturating_sub(digit)
        } else {
            acc.saturating_add(digit)
        }
    });
    Some(value)
}
