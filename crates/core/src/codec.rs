//! Normalization of multi-value fields (phone numbers, handles, account
//! numbers, routing codes).
//!
//! Cleaning is lossy: the output is a human-readable flattening of the list,
//! not something that can be decoded back into the original structure.
//! Nothing here fails; unparseable input degrades to [`PLACEHOLDER`] or to a
//! best-effort stripped string.

use crate::field_value::FieldValue;

/// Stands in for a missing or empty multi-value field.
pub const PLACEHOLDER: &str = "N/A";

/// Raw shapes a multi-value field arrives in.
#[derive(Debug, Clone, Copy)]
pub enum RawMultiValue<'a> {
    Missing,
    List(&'a [String]),
    Text(&'a str),
}

impl<'a> From<&'a FieldValue> for RawMultiValue<'a> {
    fn from(value: &'a FieldValue) -> Self {
        match value {
            FieldValue::Null => RawMultiValue::Missing,
            FieldValue::Text(s) => RawMultiValue::Text(s),
            // Numeric cells carry no list; see clean_field_value.
            FieldValue::Integer(_) | FieldValue::Real(_) => RawMultiValue::Missing,
        }
    }
}

impl<'a> From<&'a [String]> for RawMultiValue<'a> {
    fn from(list: &'a [String]) -> Self {
        RawMultiValue::List(list)
    }
}

impl<'a> From<&'a str> for RawMultiValue<'a> {
    fn from(text: &'a str) -> Self {
        RawMultiValue::Text(text)
    }
}

/// Flatten a multi-value field into one space-joined string.
///
/// - missing or empty input gives [`PLACEHOLDER`];
/// - a list joins its trimmed, non-blank items with a single space;
/// - text that looks like an array literal (`["a","b"]`) has its list
///   punctuation stripped; other text is trimmed.
pub fn clean_multi_value<'a>(raw: impl Into<RawMultiValue<'a>>) -> String {
    let cleaned = match raw.into() {
        RawMultiValue::Missing => String::new(),
        RawMultiValue::List(items) => items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        RawMultiValue::Text(text) if looks_like_list(text) => strip_list_syntax(text),
        RawMultiValue::Text(text) => text.trim().to_string(),
    };
    if cleaned.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        cleaned
    }
}

/// Clean a stored field value. Numbers keep their textual form.
pub fn clean_field_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Integer(_) | FieldValue::Real(_) => value.to_segment(),
        other => clean_multi_value(other),
    }
}

/// Remove brackets and quotes, turn commas into spaces and collapse
/// whitespace. No placeholder handling: blank input gives an empty string.
pub fn strip_list_syntax(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '[' | ']' | '"' | '\''))
        .map(|c| if c == ',' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn looks_like_list(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with('[') && trimmed.ends_with(']')
}

/// Serialize a list as a JSON array literal, the storage form intake uses for
/// handles, account numbers and routing codes. `None` for an empty list.
pub fn encode_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    serde_json::to_string(items).ok()
}

/// Parse a stored list. JSON arrays are decoded (non-string elements keep
/// their JSON text); anything else is split on commas. Blank items are dropped.
pub fn decode_list(raw: &str) -> Vec<String> {
    let items: Vec<String> = match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
        Ok(values) => values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Err(_) => raw.split(',').map(str::to_string).collect(),
    };
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Render a cell for reports: `<br>` variants become newlines, lines are
/// trimmed and blank lines dropped. Empty cells show [`PLACEHOLDER`].
pub fn display_cell(value: &FieldValue) -> String {
    let text = match value {
        FieldValue::Null => return PLACEHOLDER.to_string(),
        other => other.to_segment(),
    };
    let rendered = replace_line_breaks(&text)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if rendered.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        rendered
    }
}

/// Replace `<br>`, `<br/>`, `<br />` (any case) with `\n`.
fn replace_line_breaks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = find_ascii_ci(rest, "<br") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 3..];
        let tail = after.trim_start();
        let tail = tail.strip_prefix('/').unwrap_or(tail);
        match tail.strip_prefix('>') {
            Some(remaining) => {
                out.push('\n');
                rest = remaining;
            }
            None => {
                out.push_str(&rest[pos..pos + 3]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    hay.windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}
