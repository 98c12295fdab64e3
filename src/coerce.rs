//! Conversion between native Rust values and the JSON trees handlers exchange.
//!
//! Handlers receive their arguments as a JSON object and return a JSON value.
//! A returned string is sent verbatim; anything else is sent as compact JSON
//! text. Sequences always serialize as JSON arrays, so an empty collection
//! reaches the client as `[]`.

use crate::error::{ToolError, ToolResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Serialize a native value into a JSON tree.
pub fn to_value<T: Serialize>(native: &T) -> ToolResult<Value> {
    serde_json::to_value(native)
        .map_err(|e| ToolError::failed(format!("Result is not serializable: {}", e)))
}

/// Deserialize a JSON tree into a native value.
pub fn from_value<T: DeserializeOwned>(value: Value) -> ToolResult<T> {
    serde_json::from_value(value).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Deserialize tool arguments into a typed struct.
pub fn parse_arguments<T: DeserializeOwned>(arguments: Map<String, Value>) -> ToolResult<T> {
    from_value(Value::Object(arguments))
}

/// Text form of a handler result or prompt argument.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Point {
        x: i64,
        y: i64,
    }

    #[test]
    fn test_strings_are_verbatim() {
        assert_eq!(to_text(&json!("hello \"world\"")), "hello \"world\"");
    }

    #[test]
    fn test_scalars_and_trees() {
        assert_eq!(to_text(&json!(5)), "5");
        assert_eq!(to_text(&json!(true)), "true");
        assert_eq!(to_text(&json!({"a": [1, 2]})), r#"{"a":[1,2]}"#);
        assert_eq!(to_text(&Value::Null), "");
    }

    #[test]
    fn test_empty_collections_are_arrays() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(to_text(&to_value(&empty).unwrap()), "[]");
    }

    #[test]
    fn test_parse_arguments() {
        let mut args = Map::new();
        args.insert("x".into(), json!(1));
        args.insert("y".into(), json!(2));
        let point: Point = parse_arguments(args).unwrap();
        assert_eq!((point.x, point.y), (1, 2));

        let err = parse_arguments::<Point>(Map::new()).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
