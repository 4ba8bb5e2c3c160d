//! Conversational context types. Truncation *logic* lives in `mcp-context`;
//! this module only defines the shapes it operates on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub tokens: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TruncateStrategy {
    #[default]
    OldestFirst,
    PreservingUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub tenant_id: String,
    pub agent_id: String,
    pub model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub max_tokens: u32,
    pub current_tokens: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Row-level optimistic concurrency token; incremented on every write.
    pub version: u64,
    pub content: Vec<ContextItem>,
}

impl Context {
    /// Recompute `current_tokens` from `content` — the one invariant every
    /// write path must restore before returning.
    pub fn recompute_tokens(&mut self) {
        self.current_tokens = self.content.iter().map(|i| i.tokens).sum();
    }

    pub fn is_large(&self, large_threshold: u32) -> bool {
        self.current_tokens > large_threshold
    }
}

/// Default threshold above which context content is offloaded to object
/// storage rather than kept inline in the relational row.
pub const LARGE_THRESHOLD: u32 = 50_000;

#[cfg(test)]
mod tests {
    use super::*;

    fn item(role: Role, tokens: u32, ts: i64) -> ContextItem {
        ContextItem {
            id: format!("item-{ts}"),
            role,
            content: "x".into(),
            tokens,
            timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn recompute_tokens_sums_items() {
        let mut ctx = Context {
            id: "c1".into(),
            tenant_id: "t1".into(),
            agent_id: "a1".into(),
            model_id: "m1".into(),
            session_id: None,
            max_tokens: 100,
            current_tokens: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            expires_at: None,
            metadata: HashMap::new(),
            version: 1,
            content: vec![item(Role::User, 5, 1), item(Role::Assistant, 10, 2)],
        };
        ctx.recompute_tokens();
        assert_eq!(ctx.current_tokens, 15);
    }

    #[test]
    fn is_large_respects_threshold() {
        let ctx = Context {
            id: "c1".into(),
            tenant_id: "t1".into(),
            agent_id: "a1".into(),
            model_id: "m1".into(),
            session_id: None,
            max_tokens: 100,
            current_tokens: 60_000,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            expires_at: None,
            metadata: HashMap::new(),
            version: 1,
            content: vec![],
        };
        assert!(ctx.is_large(LARGE_THRESHOLD));
    }
}
