use serde_json;

/// Renders text as a quoted, escaped string literal.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap()
}
