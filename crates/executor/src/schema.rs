//! Minimal JSON Schema subset validator for tool call parameters (§4.6 step
//! 2). Supports `type`, `properties`, `required`, and `items` — the shape
//! [`crate::openapi`]'s (via `mcp-registry`) action extraction actually
//! produces. Not a general JSON Schema implementation.

use mcp_domain::error::{CoreError, Result};
use mcp_domain::param::ParamValue;
use serde_json::Value;

fn type_matches(expected: &str, value: &ParamValue) -> bool {
    match expected {
        "object" => matches!(value, ParamValue::Object(_)),
        "array" => matches!(value, ParamValue::Array(_)),
        "string" => matches!(value, ParamValue::String(_)),
        "integer" => matches!(value, ParamValue::Int(_)),
        "number" => matches!(value, ParamValue::Int(_) | ParamValue::Float(_)),
        "boolean" => matches!(value, ParamValue::Bool(_)),
        "null" => matches!(value, ParamValue::Null),
        // Unknown schema type keywords don't fail the call closed.
        _ => true,
    }
}

fn validate_node(schema: &Value, value: &ParamValue, path: &str) -> Result<()> {
    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(expected, value) {
            return Err(CoreError::InvalidArgument(format!(
                "{path}: expected {expected}, got {}",
                value.type_name()
            )));
        }
    }

    if let Some(obj) = value.as_object() {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if !obj.contains_key(name) {
                    return Err(CoreError::InvalidArgument(format!(
                        "{path}.{name}: required field missing"
                    )));
                }
            }
        }
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (key, prop_schema) in properties {
                if let Some(v) = obj.get(key) {
                    validate_node(prop_schema, v, &format!("{path}.{key}"))?;
                }
            }
        }
    }

    if let ParamValue::Array(items) = value {
        if let Some(item_schema) = schema.get("items") {
            for (idx, item) in items.iter().enumerate() {
                validate_node(item_schema, item, &format!("{path}[{idx}]"))?;
            }
        }
    }

    Ok(())
}

pub fn validate(schema: &Value, params: &ParamValue) -> Result<()> {
    validate_node(schema, params, "$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn obj(pairs: &[(&str, ParamValue)]) -> ParamValue {
        ParamValue::Object(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect::<BTreeMap<_, _>>())
    }

    #[test]
    fn accepts_matching_required_fields() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"owner": {"type": "string"}},
            "required": ["owner"],
        });
        let params = obj(&[("owner", ParamValue::String("octo".into()))]);
        assert!(validate(&schema, &params).is_ok());
    }

    #[test]
    fn reports_missing_required_field_path() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"owner": {"type": "string"}},
            "required": ["owner"],
        });
        let params = obj(&[]);
        let err = validate(&schema, &params).unwrap_err();
        assert_eq!(err.code(), mcp_domain::error::ErrorCode::InvalidArgument);
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn rejects_type_mismatch() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"count": {"type": "integer"}},
            "required": [],
        });
        let params = obj(&[("count", ParamValue::String("not-a-number".into()))]);
        let err = validate(&schema, &params).unwrap_err();
        assert_eq!(err.code(), mcp_domain::error::ErrorCode::InvalidArgument);
    }
}
