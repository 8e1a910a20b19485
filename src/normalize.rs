//! Canonical forms for free-text property names and loosely-typed values.
//!
//! Exporters disagree on casing, accents, separators and on whether a value is
//! a bare number, a string with units, or an object wrapping either. Every
//! comparison of a property *name* goes through [`normalize`]; every numeric
//! read of a property *value* goes through [`numeric`].

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Keys that wrap the real value in nested property objects, checked in order.
pub const VALUE_HOLDER_KEYS: &[&str] = &["value", "Value", "val", "Val", "NominalValue"];

static FLOAT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?").expect("valid float pattern")
});

/// Lower-cases, strips diacritics and drops whitespace, `_`, `-` and `.`.
///
/// ```
/// use ifc_takeoff::normalize::normalize;
///
/// assert_eq!(normalize("Net Side-Area"), "netsidearea");
/// assert_eq!(normalize("Superficie_Útil"), "superficieutil");
/// ```
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| !c.is_whitespace() && !matches!(c, '_' | '-' | '.'))
        .collect()
}

/// Ordering key for display labels: case- and accent-insensitive, but keeps
/// word boundaries so "Muro A" sorts before "MuroA1".
#[must_use]
pub fn collation_key(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Compares two labels the way the take-off tables sort them. Labels that
/// collate equally fall back to their raw form so the order is total.
#[must_use]
pub fn compare_labels(a: &str, b: &str) -> std::cmp::Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

/// Extracts a number from a property value.
///
/// Strings accept a decimal comma and trailing units ("12,5 m²" → 12.5).
/// Objects are unwrapped through [`VALUE_HOLDER_KEYS`]. Anything else,
/// including booleans and non-finite results, yields `None`.
#[must_use]
pub fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => numeric_str(s),
        Value::Object(map) => VALUE_HOLDER_KEYS
            .iter()
            .filter_map(|k| map.get(*k))
            .find_map(numeric),
        _ => None,
    }
}

/// String form of [`numeric`].
#[must_use]
pub fn numeric_str(raw: &str) -> Option<f64> {
    let dotted = raw.replace(',', ".");
    FLOAT_PATTERN
        .find(&dotted)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|f| f.is_finite())
}

/// Extracts a non-empty, trimmed text from a property value, unwrapping value
/// holders the same way as [`numeric`]. Numbers are rendered as text.
#[must_use]
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => VALUE_HOLDER_KEYS
            .iter()
            .filter_map(|k| map.get(*k))
            .find_map(text),
        _ => None,
    }
}
