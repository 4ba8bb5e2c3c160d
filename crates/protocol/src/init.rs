//! `initialize` request/response payloads and protocol version negotiation.

use serde::{Deserialize, Serialize};

/// Versions this server understands, newest first. The first entry is what
/// gets offered back when a client asks for something unsupported.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: serde_json::Value,
    pub client_info: ClientInfo,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: bool,
    pub resources: bool,
    pub prompts: bool,
    pub logging: bool,
    pub completion: bool,
}

impl ServerCapabilities {
    pub fn full() -> Self {
        Self {
            tools: true,
            resources: true,
            prompts: true,
            logging: true,
            completion: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
}

/// Resolve the protocol version to reply with. Returns `Some` when the
/// client's requested version is supported outright. When unsupported, the
/// caller replies once with `SUPPORTED_PROTOCOL_VERSIONS[0]` and stays in
/// `Initializing` rather than closing — the client may retry `initialize`
/// with the offered version or close itself.
pub fn negotiate(requested: &str) -> NegotiationOutcome {
    if SUPPORTED_PROTOCOL_VERSIONS.contains(&requested) {
        NegotiationOutcome::Accepted(requested.to_string())
    } else {
        NegotiationOutcome::Offered(SUPPORTED_PROTOCOL_VERSIONS[0].to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationOutcome {
    Accepted(String),
    Offered(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_version_is_accepted() {
        assert_eq!(
            negotiate("2024-11-05"),
            NegotiationOutcome::Accepted("2024-11-05".into())
        );
    }

    #[test]
    fn unsupported_version_offers_highest_supported() {
        assert_eq!(
            negotiate("1999-01-01"),
            NegotiationOutcome::Offered("2024-11-05".into())
        );
    }
}
