//! Context Manager (§4.4): CRUD over conversational contexts plus
//! truncation, large-content offload to the object store, and read-through
//! caching.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mcp_domain::context::{Context, ContextItem, Role, TruncateStrategy, LARGE_THRESHOLD};
use mcp_domain::error::{CoreError, Result};
use mcp_store::TenantScopedStore;
use serde_json::Value;

use crate::truncation::{self, TruncationMethod};

const MAX_RETRY_ON_VERSION_CONFLICT: u32 = 1;

pub struct CreateContextRequest {
    pub agent_id: String,
    pub model_id: String,
    pub session_id: Option<String>,
    pub max_tokens: Option<u32>,
    pub content: Vec<ContextItem>,
    pub metadata: HashMap<String, Value>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Append,
    Replace,
}

pub struct UpdateContextRequest {
    pub content: Vec<ContextItem>,
    pub metadata: HashMap<String, Value>,
}

pub struct UpdateOptions {
    pub mode: UpdateMode,
    pub truncate: bool,
    pub truncate_strategy: TruncateStrategy,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            mode: UpdateMode::Append,
            truncate: true,
            truncate_strategy: TruncateStrategy::OldestFirst,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ContextSummary {
    pub total_items: usize,
    pub per_role_counts: HashMap<String, usize>,
    pub current_tokens: u32,
    pub max_tokens: u32,
    pub model_id: String,
}

const DEFAULT_MAX_TOKENS: u32 = 8_192;
const CACHE_KIND: &str = "context";

pub struct ContextManager {
    store: TenantScopedStore,
}

fn blob_key(id: &str) -> String {
    format!("contexts/{id}.json")
}

fn strategy_to_method(strategy: TruncateStrategy) -> TruncationMethod {
    match strategy {
        TruncateStrategy::OldestFirst => TruncationMethod::OldestFirst,
        TruncateStrategy::PreservingUser => TruncationMethod::PreserveUser,
    }
}

impl ContextManager {
    pub fn new(store: TenantScopedStore) -> Self {
        Self { store }
    }

    pub fn create_context(&self, req: CreateContextRequest) -> Result<Context> {
        if req.agent_id.trim().is_empty() || req.model_id.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "agent_id and model_id are required".into(),
            ));
        }

        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();

        let content: Vec<ContextItem> = req
            .content
            .into_iter()
            .map(|mut item| {
                if item.id.trim().is_empty() {
                    item.id = uuid::Uuid::new_v4().to_string();
                }
                item
            })
            .collect();

        let mut ctx = Context {
            id: id.clone(),
            tenant_id: self.store.tenant_id().to_string(),
            agent_id: req.agent_id,
            model_id: req.model_id,
            session_id: req.session_id,
            max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            current_tokens: 0,
            created_at: now,
            updated_at: now,
            expires_at: req.expires_at,
            metadata: req.metadata,
            version: 1,
            content,
        };
        ctx.recompute_tokens();

        self.persist_new(&mut ctx)?;
        self.cache_put(&ctx);
        Ok(ctx)
    }

    fn persist_new(&self, ctx: &mut Context) -> Result<()> {
        if ctx.is_large(LARGE_THRESHOLD) {
            self.offload_content(ctx)?;
        }
        self.store.insert_context(ctx.clone())
    }

    fn offload_content(&self, ctx: &mut Context) -> Result<()> {
        let bytes = serde_json::to_vec(&ctx.content)?;
        self.store.put_blob(&blob_key(&ctx.id), bytes)?;
        ctx.metadata
            .insert("content_offloaded".into(), Value::Bool(true));
        ctx.content.clear();
        Ok(())
    }

    fn rehydrate(&self, mut ctx: Context) -> Result<Context> {
        if ctx.metadata.get("content_offloaded").and_then(|v| v.as_bool()) == Some(true) {
            if let Some(bytes) = self.store.get_blob(&blob_key(&ctx.id))? {
                ctx.content = serde_json::from_slice(&bytes)?;
            }
        }
        Ok(ctx)
    }

    pub fn get_context(&self, id: &str) -> Result<Context> {
        if let Some(cached) = self.store.cache_get(CACHE_KIND, id) {
            if let Ok(ctx) = serde_json::from_value::<Context>(cached) {
                return Ok(ctx);
            }
        }

        let ctx = self.store.get_context(id)?;
        let ctx = self.rehydrate(ctx)?;
        self.cache_put(&ctx);
        Ok(ctx)
    }

    fn cache_put(&self, ctx: &Context) {
        let ttl_secs = ctx
            .expires_at
            .map(|exp| {
                let until = (exp - Utc::now()).num_seconds().max(0) as u64;
                until.min(24 * 3600)
            })
            .unwrap_or(24 * 3600);
        if let Ok(value) = serde_json::to_value(ctx) {
            self.store.cache_put(CACHE_KIND, &ctx.id, value, ttl_secs);
        }
    }

    pub fn update_context(
        &self,
        id: &str,
        update: UpdateContextRequest,
        options: UpdateOptions,
    ) -> Result<Context> {
        let mut attempts = 0;
        loop {
            let mut ctx = self.get_context(id)?;
            let expected_version = ctx.version;

            match options.mode {
                UpdateMode::Append => {
                    for mut item in update.content.clone() {
                        if item.id.trim().is_empty() {
                            item.id = uuid::Uuid::new_v4().to_string();
                        }
                        ctx.content.push(item);
                    }
                }
                UpdateMode::Replace => {
                    ctx.content = update
                        .content
                        .clone()
                        .into_iter()
                        .map(|mut item| {
                            if item.id.trim().is_empty() {
                                item.id = uuid::Uuid::new_v4().to_string();
                            }
                            item
                        })
                        .collect();
                }
            }
            for (k, v) in &update.metadata {
                ctx.metadata.insert(k.clone(), v.clone());
            }
            ctx.recompute_tokens();

            if ctx.current_tokens > ctx.max_tokens && options.truncate {
                let method = strategy_to_method(options.truncate_strategy);
                ctx.content = truncation::apply(method, &ctx.content, ctx.max_tokens);
                ctx.recompute_tokens();
            }

            // Optimistic concurrency: re-check the stored version right
            // before writing. The in-memory store has no native CAS, so the
            // manager enforces it here by re-reading immediately prior to
            // the write.
            let still_current = self.store.get_context(id)?.version == expected_version;
            if !still_current {
                if attempts >= MAX_RETRY_ON_VERSION_CONFLICT {
                    return Err(CoreError::FailedPrecondition(format!(
                        "context {id} was modified concurrently"
                    )));
                }
                attempts += 1;
                continue;
            }

            ctx.version = expected_version + 1;
            ctx.updated_at = Utc::now();

            if ctx.is_large(LARGE_THRESHOLD) {
                self.offload_content(&mut ctx)?;
            } else {
                ctx.metadata.remove("content_offloaded");
            }

            self.store.update_context(ctx.clone())?;
            self.cache_put(&ctx);
            return Ok(ctx);
        }
    }

    pub fn delete_context(&self, id: &str) -> Result<bool> {
        let _ = self.store.delete_blob(&blob_key(id));
        let deleted = self.store.delete_context(id)?;
        Ok(deleted)
    }

    pub fn list_contexts(&self, agent_id: Option<&str>) -> Result<Vec<Context>> {
        let mut contexts = self.store.list_contexts(agent_id)?;
        contexts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        for ctx in &mut contexts {
            ctx.content.clear();
        }
        Ok(contexts)
    }

    pub fn summarize_context(&self, id: &str) -> Result<ContextSummary> {
        let ctx = self.get_context(id)?;
        let mut per_role_counts = HashMap::new();
        for item in &ctx.content {
            *per_role_counts.entry(role_label(item.role).to_string()).or_insert(0) += 1;
        }
        Ok(ContextSummary {
            total_items: ctx.content.len(),
            per_role_counts,
            current_tokens: ctx.current_tokens,
            max_tokens: ctx.max_tokens,
            model_id: ctx.model_id,
        })
    }

    pub fn search_in_context(&self, id: &str, query: &str) -> Result<Vec<ContextItem>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let ctx = self.get_context(id)?;
        let needle = query.to_lowercase();
        Ok(ctx
            .content
            .into_iter()
            .filter(|item| item.content.to_lowercase().contains(&needle))
            .collect())
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
        Role::Other => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_store::{InMemoryCache, InMemoryObjectStore, InMemoryStore};
    use std::sync::Arc;

    fn manager() -> ContextManager {
        let store = TenantScopedStore::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryCache::new()),
            "tenant-a",
        );
        ContextManager::new(store)
    }

    fn item(role: Role, content: &str, tokens: u32) -> ContextItem {
        ContextItem {
            id: String::new(),
            role,
            content: content.into(),
            tokens,
            timestamp: Utc::now(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn create_and_get_round_trips() {
        let mgr = manager();
        let ctx = mgr
            .create_context(CreateContextRequest {
                agent_id: "agent-1".into(),
                model_id: "gpt-4".into(),
                session_id: None,
                max_tokens: Some(1000),
                content: vec![item(Role::User, "hello", 5)],
                metadata: Default::default(),
                expires_at: None,
            })
            .unwrap();

        let fetched = mgr.get_context(&ctx.id).unwrap();
        assert_eq!(fetched.current_tokens, 5);
        assert_eq!(fetched.content.len(), 1);
    }

    #[test]
    fn create_requires_agent_and_model() {
        let mgr = manager();
        let err = mgr
            .create_context(CreateContextRequest {
                agent_id: "".into(),
                model_id: "gpt-4".into(),
                session_id: None,
                max_tokens: None,
                content: vec![],
                metadata: Default::default(),
                expires_at: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), mcp_domain::error::ErrorCode::InvalidArgument);
    }

    #[test]
    fn update_append_accumulates_tokens() {
        let mgr = manager();
        let ctx = mgr
            .create_context(CreateContextRequest {
                agent_id: "agent-1".into(),
                model_id: "gpt-4".into(),
                session_id: None,
                max_tokens: Some(1000),
                content: vec![item(Role::User, "hi", 5)],
                metadata: Default::default(),
                expires_at: None,
            })
            .unwrap();

        let updated = mgr
            .update_context(
                &ctx.id,
                UpdateContextRequest {
                    content: vec![item(Role::Assistant, "hello back", 5)],
                    metadata: Default::default(),
                },
                UpdateOptions::default(),
            )
            .unwrap();

        assert_eq!(updated.current_tokens, 10);
        assert_eq!(updated.content.len(), 2);
        assert_eq!(updated.version, 2);
    }

    #[test]
    fn update_triggers_truncation_when_over_budget() {
        let mgr = manager();
        let ctx = mgr
            .create_context(CreateContextRequest {
                agent_id: "agent-1".into(),
                model_id: "gpt-4".into(),
                session_id: None,
                max_tokens: Some(10),
                content: vec![item(Role::User, "first", 8)],
                metadata: Default::default(),
                expires_at: None,
            })
            .unwrap();

        let updated = mgr
            .update_context(
                &ctx.id,
                UpdateContextRequest {
                    content: vec![item(Role::User, "second", 8)],
                    metadata: Default::default(),
                },
                UpdateOptions::default(),
            )
            .unwrap();

        assert!(updated.current_tokens <= 10);
    }

    #[test]
    fn delete_is_idempotent() {
        let mgr = manager();
        let ctx = mgr
            .create_context(CreateContextRequest {
                agent_id: "agent-1".into(),
                model_id: "gpt-4".into(),
                session_id: None,
                max_tokens: None,
                content: vec![],
                metadata: Default::default(),
                expires_at: None,
            })
            .unwrap();

        assert!(mgr.delete_context(&ctx.id).unwrap());
        assert!(!mgr.delete_context(&ctx.id).unwrap());
    }

    #[test]
    fn search_empty_query_returns_empty() {
        let mgr = manager();
        let ctx = mgr
            .create_context(CreateContextRequest {
                agent_id: "agent-1".into(),
                model_id: "gpt-4".into(),
                session_id: None,
                max_tokens: None,
                content: vec![item(Role::User, "needle in haystack", 3)],
                metadata: Default::default(),
                expires_at: None,
            })
            .unwrap();

        assert!(mgr.search_in_context(&ctx.id, "").unwrap().is_empty());
        assert_eq!(mgr.search_in_context(&ctx.id, "needle").unwrap().len(), 1);
    }

    #[test]
    fn list_contexts_strips_content() {
        let mgr = manager();
        mgr.create_context(CreateContextRequest {
            agent_id: "agent-1".into(),
            model_id: "gpt-4".into(),
            session_id: None,
            max_tokens: None,
            content: vec![item(Role::User, "x", 1)],
            metadata: Default::default(),
            expires_at: None,
        })
        .unwrap();

        let list = mgr.list_contexts(None).unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].content.is_empty());
    }
}
