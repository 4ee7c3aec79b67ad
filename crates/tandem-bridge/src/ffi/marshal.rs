//! Value marshaling - bridge values ↔ JSON wire text
//!
//! Arguments and results cross the native boundary as JSON:
//! - `args_to_json()`: encode an argument list as a JSON array
//! - `value_from_json()`: decode a returned JSON document
//!
//! Proxies and non-finite numbers have no wire representation and are
//! rejected rather than silently coerced.

use crate::value::Value;
use serde_json::{Map, Number};
use thiserror::Error;

/// Marshal error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarshalError {
    /// The value has no wire representation
    #[error("Cannot marshal a {0} value across the native boundary")]
    Unsupported(&'static str),
    /// NaN or infinity
    #[error("Number {0} has no JSON representation")]
    NonFiniteNumber(f64),
    /// The foreign side sent text that is not valid JSON
    #[error("Malformed wire text: {0}")]
    Malformed(String),
}

/// Convert a bridge value to JSON
pub fn to_json(value: &Value) -> Result<serde_json::Value, MarshalError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => {
            let number = Number::from_f64(*n).ok_or(MarshalError::NonFiniteNumber(*n))?;
            serde_json::Value::Number(number)
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect::<Result<_, _>>()?)
        }
        Value::Object(fields) => {
            let mut map = Map::new();
            for (key, field) in fields {
                map.insert(key.clone(), to_json(field)?);
            }
            serde_json::Value::Object(map)
        }
        Value::Proxy(_) => return Err(MarshalError::Unsupported(value.type_name())),
    })
}

/// Convert JSON to a bridge value
pub fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        // as_f64 only fails for arbitrary-precision numbers, which are not enabled
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::Array(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
    }
}

/// Encode an argument list as JSON array text
pub fn args_to_json(args: &[Value]) -> Result<String, MarshalError> {
    let items = args.iter().map(to_json).collect::<Result<Vec<_>, _>>()?;
    serde_json::to_string(&items).map_err(|e| MarshalError::Malformed(e.to_string()))
}

/// Decode JSON text returned by the foreign side
///
/// Empty text decodes to null, which is what void methods send back.
pub fn value_from_json(text: &str) -> Result<Value, MarshalError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text)
        .map(from_json)
        .map_err(|e| MarshalError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_args_to_json() {
        let args = vec![Value::from("hi"), Value::from(2), Value::Null];
        assert_eq!(args_to_json(&args).unwrap(), r#"["hi",2.0,null]"#);
    }

    #[test]
    fn test_nested_object() {
        let mut fields = BTreeMap::new();
        fields.insert("k".to_string(), Value::Array(vec![Value::Bool(false)]));
        let json = to_json(&Value::Object(fields)).unwrap();
        assert_eq!(json, serde_json::json!({"k": [false]}));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert_eq!(
            to_json(&Value::Number(f64::INFINITY)),
            Err(MarshalError::NonFiniteNumber(f64::INFINITY))
        );
    }

    #[test]
    fn test_value_from_json() {
        assert_eq!(value_from_json("").unwrap(), Value::Null);
        assert_eq!(value_from_json("  ").unwrap(), Value::Null);
        assert_eq!(
            value_from_json(r#"[1, "a"]"#).unwrap(),
            Value::Array(vec![Value::from(1), Value::from("a")])
        );
    }

    #[test]
    fn test_malformed_text() {
        assert!(matches!(
            value_from_json("{nope"),
            Err(MarshalError::Malformed(_))
        ));
    }
}
