//! [`AppState`] construction extracted from `main.rs`, the same split the
//! teacher keeps so CLI subcommands (`doctor`, `config validate`) can boot
//! the runtime without ever opening an HTTP listener.

use std::sync::Arc;

use anyhow::Context;
use mcp_domain::config::{Config, ConfigSeverity};
use mcp_executor::CircuitBreakerRegistry;
use mcp_session::SharedDeps;
use mcp_store::{InMemoryCache, InMemoryObjectStore, InMemoryStore, KeyResolver};
use mcp_vault::Vault;

use crate::state::AppState;

/// Validates config and wires up the store/vault/breaker backends into a
/// fully-built [`AppState`]. Shared by `serve` and `doctor`.
///
/// Only the in-memory store backends exist today (§9 decision: no real
/// relational/object/cache backend is in scope) — `config.store.*` fields
/// are validated but not yet dispatched on, so a configured DSN is silently
/// unused rather than erroring. Worth revisiting once a real backend lands.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let relational = Arc::new(InMemoryStore::new());
    let objects = Arc::new(InMemoryObjectStore::new());
    let cache = Arc::new(InMemoryCache::new());
    tracing::info!("in-memory store backends ready");

    let vault = Arc::new(
        Vault::from_env(&config.vault.master_secret_env, config.vault.key_version)
            .context("initializing vault")?,
    );
    tracing::info!(key_version = config.vault.key_version, "vault ready");

    let breakers = Arc::new(CircuitBreakerRegistry::new(
        config.tools.circuit_breaker_threshold,
        std::time::Duration::from_secs(config.tools.circuit_breaker_cooldown_secs),
    ));

    let deps = SharedDeps {
        relational: relational.clone(),
        objects,
        cache,
        vault,
        breakers,
    };
    let keys = Arc::new(KeyResolver::new(relational));

    Ok(AppState { config, deps, keys })
}
