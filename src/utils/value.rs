use serde_json::Value;

/// Convert arbitrary JSON values into sanitized strings for error messages and logs.
pub fn value_to_string(value: Value) -> String {
    let raw = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    };
    sanitize(raw)
}

fn sanitize(s: String) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_and_control_characters() {
        assert_eq!(value_to_string(json!("bad\ntoken")), "badtoken");
        assert_eq!(value_to_string(json!(7)), "7");
        assert_eq!(value_to_string(json!(false)), "false");
        assert_eq!(value_to_string(json!({"a": 1})), r#"{"a":1}"#);
    }
}
