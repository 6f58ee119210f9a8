//! Small value helpers shared by the catalog, normalizer and webhook code.

use serde_json::Value;

/// Canonical text of a scalar: strings verbatim, everything else as JSON text
pub fn canonical_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Identifier text; `null`, `false` and empty strings count as absent
pub fn stringify_id(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(canonical_text(other)),
    }
}

/// Non-empty string content, `None` for anything else
pub fn non_empty_text(value: &Value) -> Option<String> {
    value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

/// The first `max_chars` characters of `text`
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_text() {
        assert_eq!(canonical_text(&json!("1")), "1");
        assert_eq!(canonical_text(&json!(2)), "2");
        assert_eq!(canonical_text(&json!(true)), "true");
    }

    #[test]
    fn test_stringify_id_absent_values() {
        assert_eq!(stringify_id(&json!(null)), None);
        assert_eq!(stringify_id(&json!("")), None);
        assert_eq!(stringify_id(&json!(false)), None);
        assert_eq!(stringify_id(&json!(42)), Some("42".to_string()));
    }

    #[test]
    fn test_preview_counts_characters() {
        assert_eq!(preview("héllo", 2), "hé");
        assert_eq!(preview("abc", 800), "abc");
    }
}
