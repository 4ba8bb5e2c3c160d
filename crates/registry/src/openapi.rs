//! Minimal OpenAPI parsing: extracts one action per operation, keyed by
//! `operationId` (falling back to `METHOD /path`), with its parameter
//! schema. No full OpenAPI object model — only what `ConfirmTool` needs to
//! materialize [`mcp_domain::tool_config::ToolConfiguration::actions`].

use std::collections::BTreeMap;

use mcp_domain::error::{CoreError, Result};
use serde_json::Value;

/// Parses a raw OpenAPI (2.0 or 3.x) document and returns `action name ->
/// JSON Schema for its parameters`.
pub fn extract_actions(spec: &Value) -> Result<BTreeMap<String, Value>> {
    let paths = spec
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| CoreError::InvalidArgument("spec has no \"paths\" object".into()))?;

    let mut actions = BTreeMap::new();
    for (path, methods) in paths {
        let Some(methods) = methods.as_object() else {
            continue;
        };
        for (method, operation) in methods {
            let Some(operation) = operation.as_object() else {
                continue;
            };
            if !HTTP_METHODS.contains(&method.to_lowercase().as_str()) {
                continue;
            }
            let name = operation
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} {}", method.to_uppercase(), path));

            let schema = parameter_schema(operation, &method.to_uppercase(), path);
            actions.insert(name, schema);
        }
    }

    if actions.is_empty() {
        return Err(CoreError::InvalidArgument(
            "spec declares no operations".into(),
        ));
    }
    Ok(actions)
}

const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "patch", "head", "options"];

/// Builds a JSON Schema object from an operation's `parameters` array and
/// (for 3.x) its `requestBody` content schema. Best-effort — unknown shapes
/// degrade to an empty object schema rather than failing the whole parse.
///
/// Carries `x-method`/`x-path` alongside the standard schema keywords so
/// `mcp-executor` can reconstruct the outbound HTTP call from the action
/// name alone — OpenAPI's own `operationId` drops that mapping.
fn parameter_schema(operation: &serde_json::Map<String, Value>, method: &str, path: &str) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    if let Some(params) = operation.get("parameters").and_then(Value::as_array) {
        for param in params {
            let Some(name) = param.get("name").and_then(Value::as_str) else {
                continue;
            };
            let schema = param
                .get("schema")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({"type": "string"}));
            properties.insert(name.to_string(), schema);
            if param.get("required").and_then(Value::as_bool).unwrap_or(false) {
                required.push(Value::String(name.to_string()));
            }
        }
    }

    if let Some(body_schema) = operation
        .get("requestBody")
        .and_then(|b| b.get("content"))
        .and_then(|c| c.get("application/json"))
        .and_then(|m| m.get("schema"))
    {
        properties.insert("body".to_string(), body_schema.clone());
    }

    serde_json::json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": Value::Array(required),
        "x-method": method,
        "x-path": path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_operation_id() {
        let spec = serde_json::json!({
            "paths": {
                "/repos/{owner}": {
                    "get": {
                        "operationId": "getRepo",
                        "parameters": [
                            {"name": "owner", "required": true, "schema": {"type": "string"}}
                        ]
                    }
                }
            }
        });
        let actions = extract_actions(&spec).unwrap();
        assert!(actions.contains_key("getRepo"));
        let required = actions["getRepo"]["required"].as_array().unwrap();
        assert_eq!(required, &[Value::String("owner".into())]);
    }

    #[test]
    fn falls_back_to_method_and_path_when_no_operation_id() {
        let spec = serde_json::json!({
            "paths": {"/ping": {"get": {}}}
        });
        let actions = extract_actions(&spec).unwrap();
        assert!(actions.contains_key("GET /ping"));
    }

    #[test]
    fn rejects_spec_without_paths() {
        let spec = serde_json::json!({});
        let err = extract_actions(&spec).unwrap_err();
        assert_eq!(err.code(), mcp_domain::error::ErrorCode::InvalidArgument);
    }

    #[test]
    fn rejects_spec_with_no_operations() {
        let spec = serde_json::json!({"paths": {}});
        let err = extract_actions(&spec).unwrap_err();
        assert_eq!(err.code(), mcp_domain::error::ErrorCode::InvalidArgument);
    }
}
