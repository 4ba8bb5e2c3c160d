//! Wire framing for the `/ws` MCP channel (§4.7).
//!
//! Every frame is one JSON object. `id` correlates a `Request` to its
//! `Response`; `Notification`s never carry one. Unlike JSON-RPC 2.0 this
//! folds success/error into the same envelope via the optional `error` field
//! rather than a separate response shape, which keeps one `serde` struct for
//! the whole request/response/notification family.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    Request,
    Response,
    Notification,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProtocolError>,
}

impl Envelope {
    pub fn request(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            frame_type: FrameType::Request,
            id: Some(id),
            method: Some(method.into()),
            params,
            result: None,
            error: None,
        }
    }

    pub fn response(id: u64, result: Value) -> Self {
        Self {
            frame_type: FrameType::Response,
            id: Some(id),
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    pub fn error_response(id: u64, error: ProtocolError) -> Self {
        Self {
            frame_type: FrameType::Response,
            id: Some(id),
            method: None,
            params: None,
            result: None,
            error: Some(error),
        }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            frame_type: FrameType::Notification,
            id: None,
            method: Some(method.into()),
            params,
            result: None,
            error: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let env = Envelope::request(1, "tools/list", None);
        let json = serde_json::to_string(&env).unwrap();
        assert!(!json.contains("\"params\""));
        assert!(!json.contains("\"result\""));
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, Some(1));
        assert_eq!(back.method.as_deref(), Some("tools/list"));
    }

    #[test]
    fn notification_has_no_id() {
        let env = Envelope::notification("tools/list_changed", None);
        let json = serde_json::to_string(&env).unwrap();
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn error_response_carries_no_result() {
        let env = Envelope::error_response(
            4,
            ProtocolError::method_not_found("bogus/method"),
        );
        assert!(env.is_error());
        assert!(env.result.is_none());
    }
}
