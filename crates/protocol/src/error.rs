//! Envelope-level error object and its mapping from [`CoreError`].

use mcp_domain::{CoreError, ErrorCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProtocolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new("METHOD_NOT_FOUND", format!("unknown method: {method}"))
    }

    pub fn message_too_large(max_bytes: usize) -> Self {
        Self::new(
            "MESSAGE_TOO_LARGE",
            format!("message exceeds the {max_bytes} byte limit"),
        )
    }
}

impl From<CoreError> for ProtocolError {
    fn from(e: CoreError) -> Self {
        let code = match e.code() {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Internal => "INTERNAL",
            ErrorCode::Unavailable => "UNAVAILABLE",
            ErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
        };
        Self::new(code, e.to_string())
    }
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProtocolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_error_maps_code_string() {
        let pe: ProtocolError = CoreError::PermissionDenied("no".into()).into();
        assert_eq!(pe.code, "PERMISSION_DENIED");
    }

    #[test]
    fn method_not_found_names_the_method() {
        let pe = ProtocolError::method_not_found("foo/bar");
        assert!(pe.message.contains("foo/bar"));
    }
}
