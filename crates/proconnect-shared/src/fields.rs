use serde::Serializer;
use serde_json::Value;

use crate::constants::SKILLS_SEPARATOR;

/// Read a string field, rendering scalar non-strings as text.
pub fn text(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Like [`text`], but `None` for missing or blank values.
pub fn opt_text(record: &Value, key: &str) -> Option<String> {
    let value = text(record, key);
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Read a numeric field.  Numeric strings are parsed; anything else is `0.0`.
pub fn number(record: &Value, key: &str) -> f64 {
    let parsed = match record.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Read a millisecond timestamp.  Missing or malformed values are `0`.
pub fn millis(record: &Value, key: &str) -> i64 {
    match record.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

/// Read a skills-like field stored either as a comma-joined string or a list.
pub fn skills(record: &Value, key: &str) -> Vec<String> {
    match record.get(key) {
        Some(Value::String(s)) => split_skills(s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Split a comma-joined skills string into trimmed, non-empty entries.
pub fn split_skills(raw: &str) -> Vec<String> {
    raw.split(SKILLS_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Join skills back into the stored comma-separated form.
pub fn join_skills(skills: &[String]) -> String {
    skills.join(", ")
}

/// `serialize_with` adapter that stores a skills list as one string.
pub fn serialize_skills<S: Serializer>(skills: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&join_skills(skills))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_defaults_to_empty() {
        let record = json!({ "name": "Ada", "age": 36, "nothing": null });
        assert_eq!(text(&record, "name"), "Ada");
        assert_eq!(text(&record, "age"), "36");
        assert_eq!(text(&record, "nothing"), "");
        assert_eq!(text(&record, "missing"), "");
        assert_eq!(opt_text(&json!({ "link": "   " }), "link"), None);
    }

    #[test]
    fn test_number_accepts_numeric_strings() {
        let record = json!({ "rate": "45.5", "budget": 500, "bad": "lots", "flag": true });
        assert_eq!(number(&record, "rate"), 45.5);
        assert_eq!(number(&record, "budget"), 500.0);
        assert_eq!(number(&record, "bad"), 0.0);
        assert_eq!(number(&record, "flag"), 0.0);
        assert_eq!(number(&record, "missing"), 0.0);
    }

    #[test]
    fn test_millis() {
        let record = json!({ "a": 1_700_000_000_123_i64, "b": "42", "c": 12.9, "d": "x" });
        assert_eq!(millis(&record, "a"), 1_700_000_000_123);
        assert_eq!(millis(&record, "b"), 42);
        assert_eq!(millis(&record, "c"), 12);
        assert_eq!(millis(&record, "d"), 0);
    }

    #[test]
    fn test_skills_from_string_and_list() {
        let record = json!({
            "joined": " rust, go ,, sql ,",
            "list": [" rust ", "", "go", 7, null],
            "other": { "x": 1 },
        });
        assert_eq!(skills(&record, "joined"), vec!["rust", "go", "sql"]);
        assert_eq!(skills(&record, "list"), vec!["rust", "go", "7"]);
        assert!(skills(&record, "other").is_empty());
        assert!(skills(&record, "missing").is_empty());
    }
}
