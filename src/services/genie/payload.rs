//! Response payload parsing
//!
//! Genie answers are text. When structured data was requested it usually
//! arrives as plain JSON, but may be wrapped in a markdown code fence or
//! surrounded by prose.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::error::{GenieError, GenieResult};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*\n?(.*?)```").expect("valid code fence regex")
});

/// Parse a JSON-ish text payload into a value
pub fn parse_structured(text: &str) -> GenieResult<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GenieError::Parse("empty response".to_string()));
    }

    let plain_error = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(unwrap_text(value)),
        Err(e) => e,
    };

    if let Some(inner) = CODE_FENCE.captures(trimmed).and_then(|c| c.get(1))
        && let Ok(value) = serde_json::from_str::<Value>(inner.as_str().trim())
    {
        return Ok(unwrap_text(value));
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && start < end
        && let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end])
    {
        return Ok(value);
    }

    Err(GenieError::from(plain_error))
}

// A JSON string holding JSON: decode once more
fn unwrap_text(value: Value) -> Value {
    match value {
        Value::String(inner) => serde_json::from_str(inner.trim()).unwrap_or(Value::String(inner)),
        other => other,
    }
}

/// Records of a rule-based lookup: `{"queries": [...]}` or a bare array
pub fn query_records(payload: &Value) -> Vec<Value> {
    match payload {
        Value::Object(map) => match map.get("queries") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json() {
        let v = parse_structured(r#"{"queries":[{"query_id":"q1"}]}"#).unwrap();
        assert_eq!(query_records(&v), vec![json!({ "query_id": "q1" })]);
    }

    #[test]
    fn test_fenced_json() {
        let text = "Here you go:\n```json\n{\"queries\": []}\n```\nAnything else?";
        let v = parse_structured(text).unwrap();
        assert_eq!(v, json!({ "queries": [] }));
        assert!(query_records(&v).is_empty());
    }

    #[test]
    fn test_json_inside_prose() {
        let text = "The worst query is {\"queries\": [{\"query_id\": \"q7\"}]} as requested.";
        let v = parse_structured(text).unwrap();
        assert_eq!(query_records(&v).len(), 1);
    }

    #[test]
    fn test_json_encoded_as_string() {
        let text = r#""{\"queries\": [{\"query_id\": \"q3\"}]}""#;
        let v = parse_structured(text).unwrap();
        assert_eq!(query_records(&v)[0]["query_id"], "q3");
    }

    #[test]
    fn test_bare_array_and_missing_queries() {
        let v = parse_structured(r#"[{"query_id":"a"},{"query_id":"b"}]"#).unwrap();
        assert_eq!(query_records(&v).len(), 2);
        assert!(query_records(&json!({ "rows": [1] })).is_empty());
    }

    #[test]
    fn test_unparseable() {
        let err = parse_structured("I could not find any queries.").unwrap_err();
        assert!(matches!(err, GenieError::Parse(_)));
        assert!(parse_structured("   ").is_err());
    }
}
