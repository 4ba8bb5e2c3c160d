//! Dynamic-typed tool call arguments.
//!
//! Replaces an opaque `map[string]any` at the boundary with a closed sum
//! type. Wire messages still decode as [`serde_json::Value`] (that's what
//! `serde_json` gives you off a socket); [`ParamValue::from_json`] is the one
//! place that untyped shape is allowed to exist.

use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<ParamValue>),
    Object(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    pub fn from_json(v: Value) -> Self {
        match v {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ParamValue::Int(i)
                } else {
                    ParamValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => ParamValue::String(s),
            Value::Array(a) => ParamValue::Array(a.into_iter().map(ParamValue::from_json).collect()),
            Value::Object(o) => ParamValue::Object(
                o.into_iter().map(|(k, v)| (k, ParamValue::from_json(v))).collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Null => Value::Null,
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(i) => Value::Number((*i).into()),
            ParamValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::Array(items) => Value::Array(items.iter().map(ParamValue::to_json).collect()),
            ParamValue::Object(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, ParamValue>> {
        match self {
            ParamValue::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Null => "null",
            ParamValue::Bool(_) => "boolean",
            ParamValue::Int(_) => "integer",
            ParamValue::Float(_) => "number",
            ParamValue::String(_) => "string",
            ParamValue::Array(_) => "array",
            ParamValue::Object(_) => "object",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_json() {
        let v = serde_json::json!({"a": 1, "b": [true, null, "x"], "c": 1.5});
        let pv = ParamValue::from_json(v.clone());
        assert_eq!(pv.to_json(), v);
    }

    #[test]
    fn integers_stay_integers() {
        let pv = ParamValue::from_json(serde_json::json!(42));
        assert!(matches!(pv, ParamValue::Int(42)));
    }

    #[test]
    fn type_name_reports_object() {
        let pv = ParamValue::from_json(serde_json::json!({}));
        assert_eq!(pv.type_name(), "object");
    }
}
