//! Best-effort coercion of environment variable strings into typed values.
//!
//! Environment variables are always strings, but config trees are not. A raw
//! value is classified as boolean, null, number or JSON structure when it
//! parses cleanly as one; anything else is returned untouched.
//!
//! Note that any string matching the numeric grammar becomes a number, so an
//! opaque identifier like a zip code (`12345`) will not stay a string.
//! Leading-zero literals (`01234`) fail JSON parsing and do stay strings.

use regex_lite::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Numbers with more digits than this stay strings to avoid precision loss.
fn numeric_literal() -> &'static Regex {
    static NUMERIC: OnceLock<Regex> = OnceLock::new();
    NUMERIC.get_or_init(|| {
        Regex::new(r"^-?[0-9]{1,16}(\.[0-9]{1,17})?([Ee][+-]?[0-9]+)?$")
            .expect("numeric literal pattern is valid")
    })
}

/// Coerce a raw string into a `Value`.
///
/// Total and infallible: every input produces exactly one output, and a
/// failed parse returns the original string.
///
/// ```
/// use layered_conf::config::coerce;
/// use serde_json::json;
///
/// assert_eq!(coerce("true"), json!(true));
/// assert_eq!(coerce("8080"), json!(8080));
/// assert_eq!(coerce(r#"{"a":1}"#), json!({"a": 1}));
/// assert_eq!(coerce("localhost"), json!("localhost"));
/// ```
pub fn coerce(raw: &str) -> Value {
    let trimmed = raw.trim();

    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }

    let structured = trimmed.starts_with('{') || trimmed.starts_with('[') || trimmed.starts_with('"');
    if structured || numeric_literal().is_match(trimmed) {
        if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
            return parsed;
        }
    }

    Value::String(raw.to_string())
}
