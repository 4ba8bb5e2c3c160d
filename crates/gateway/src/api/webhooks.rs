//! Webhook ingress (§4.8) — `POST /webhooks/tools/{tenant_id}/{tool_id}`.
//!
//! Generalizes the teacher's `trigger_webhook` (bearer-token route plus an
//! optional per-schedule HMAC check) two ways: the secret is now per-tool
//! and vault-encrypted rather than a plaintext schedule field, and there are
//! three auth modes instead of one ([`WebhookAuthType::Hmac`], `Bearer`,
//! `None`) since not every upstream tool provider signs the same way.
//!
//! This route is intentionally outside the `require_principal` bearer-token
//! group: a third-party tool provider has no tenant API key, only whatever
//! the tool's own `webhook_config` was configured with at confirm-time. The
//! path embeds `tenant_id` for the same reason the teacher's routes never
//! needed to — every other route here resolves the tenant from the caller's
//! key, but nothing here has an opinion on who the caller is until the
//! signature check runs.
//!
//! `RelationalStore` has no enumeration method over webhook events and no
//! dead-letter table, so there is nothing to sweep in the background:
//! processing runs synchronously inline (verify -> dedup -> insert -> mark
//! processed/failed), and "dead-lettered" is just
//! `status == Failed && failure_count >= dead_letter_threshold` on the same
//! row rather than a separate queue.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use mcp_domain::error::CoreError;
use mcp_domain::tool_config::WebhookAuthType;
use mcp_domain::webhook::{WebhookEvent, WebhookEventStatus};
use mcp_store::TenantScopedStore;
use mcp_vault::compare::{digests_match, verify_hmac_signature};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}

/// The provider's own delivery/event id, when it sends one — §3/§4.8 step 3
/// dedup on `(tool_id, provider_event_id or sha256(payload))`, preferring the
/// provider id since a provider may resend an identical payload under a new
/// delivery (or redeliver the same id with a cosmetic diff).
fn provider_event_id(headers: &HeaderMap) -> Option<&str> {
    for name in ["x-github-delivery", "x-event-id"] {
        let v = header_str(headers, name);
        if !v.is_empty() {
            return Some(v);
        }
    }
    None
}

fn dedup_discriminator(headers: &HeaderMap, body: &[u8]) -> String {
    match provider_event_id(headers) {
        Some(id) => id.to_owned(),
        None => sha256_hex(body),
    }
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
        .collect()
}

fn verify_signature(
    auth_type: WebhookAuthType,
    secret: Option<&[u8]>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), CoreError> {
    match auth_type {
        WebhookAuthType::None => Ok(()),
        WebhookAuthType::Bearer => {
            let presented = header_str(headers, "authorization").strip_prefix("Bearer ").unwrap_or("");
            let Some(secret) = secret else {
                return Err(CoreError::FailedPrecondition("webhook has no secret configured".into()));
            };
            if !digests_match(presented.as_bytes(), &Sha256::digest(secret)) {
                return Err(CoreError::Unauthenticated("invalid bearer token".into()));
            }
            Ok(())
        }
        WebhookAuthType::Hmac => {
            let sig_header = header_str(headers, "x-hub-signature-256");
            let sig_hex = sig_header.strip_prefix("sha256=").unwrap_or(sig_header);
            let Some(secret) = secret else {
                return Err(CoreError::FailedPrecondition("webhook has no secret configured".into()));
            };
            if !verify_hmac_signature(secret, body, sig_hex) {
                return Err(CoreError::Unauthenticated("invalid webhook signature".into()));
            }
            Ok(())
        }
    }
}

pub async fn ingest(
    State(state): State<AppState>,
    Path((tenant_id, tool_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match ingest_inner(state, tenant_id, tool_id, headers, body).await {
        Ok(resp) => resp,
        Err(e) => ApiError(e).into_response(),
    }
}

async fn ingest_inner(
    state: AppState,
    tenant_id: String,
    tool_id: String,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, CoreError> {
    let store = TenantScopedStore::new(
        state.deps.relational.clone(),
        state.deps.objects.clone(),
        state.deps.cache.clone(),
        tenant_id.clone(),
    );

    let tool = store.get_tool_config(&tool_id)?;
    let webhook = tool
        .webhook_config
        .clone()
        .filter(|w| w.enabled)
        .ok_or_else(|| CoreError::NotFound(format!("tool {tool_id} has no active webhook")))?;

    let secret = webhook
        .secret_encrypted
        .as_ref()
        .map(|enc| state.deps.vault.decrypt(&tenant_id, enc))
        .transpose()?;

    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    let received_at = chrono::Utc::now();
    let event_type = headers.get("x-event-type").and_then(|v| v.to_str().ok()).map(str::to_owned);
    let header_map = collect_headers(&headers);

    if let Err(e) = verify_signature(webhook.auth_type, secret.as_deref(), &headers, &body) {
        let failed = WebhookEvent {
            id: Uuid::new_v4().to_string(),
            tool_id: tool_id.clone(),
            tenant_id: tenant_id.clone(),
            event_type,
            payload,
            headers: header_map,
            source_ip: String::new(),
            received_at,
            processed_at: None,
            status: WebhookEventStatus::Failed,
            error: Some(e.to_string()),
            failure_count: 1,
        };
        store.insert_webhook_event(failed)?;
        return Err(e);
    }

    let dedup_key = format!(
        "webhook-dedup:{tenant_id}:{tool_id}:{}",
        dedup_discriminator(&headers, &body)
    );
    let window_secs = webhook
        .dedup_window_secs
        .unwrap_or(state.config.webhooks.dedup_window_secs);
    if state.deps.cache.get(&dedup_key).is_some() {
        return Ok((StatusCode::OK, Json(serde_json::json!({ "status": "ignored" }))).into_response());
    }
    state.deps.cache.put(&dedup_key, serde_json::json!(true), window_secs);

    let event_id = Uuid::new_v4().to_string();
    let mut event = WebhookEvent {
        id: event_id.clone(),
        tool_id: tool_id.clone(),
        tenant_id: tenant_id.clone(),
        event_type,
        payload,
        headers: header_map,
        source_ip: String::new(),
        received_at,
        processed_at: None,
        status: WebhookEventStatus::Pending,
        error: None,
        failure_count: 0,
    };
    store.insert_webhook_event(event.clone())?;

    event.status = WebhookEventStatus::Processing;
    store.update_webhook_event(event.clone())?;

    event.status = WebhookEventStatus::Processed;
    event.processed_at = Some(chrono::Utc::now());
    store.update_webhook_event(event)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "event_id": event_id, "status": "accepted" })),
    )
        .into_response())
}

fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::Digest;
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn verify_signature_none_always_passes() {
        let headers = HeaderMap::new();
        assert!(verify_signature(WebhookAuthType::None, None, &headers, b"body").is_ok());
    }

    #[test]
    fn verify_signature_bearer_accepts_matching_token() {
        let secret = b"tool-secret";
        let token = "letmein";
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        // The configured secret is stored as the digest of the token it compares against.
        let digest = Sha256::digest(token.as_bytes());
        assert!(verify_signature(WebhookAuthType::Bearer, Some(&digest[..]), &headers, b"{}").is_ok());
        let _ = secret;
    }

    #[test]
    fn verify_signature_bearer_rejects_wrong_token() {
        let digest = Sha256::digest(b"correct");
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer wrong"));
        assert!(verify_signature(WebhookAuthType::Bearer, Some(&digest[..]), &headers, b"{}").is_err());
    }

    #[test]
    fn verify_signature_bearer_requires_configured_secret() {
        let headers = HeaderMap::new();
        assert!(verify_signature(WebhookAuthType::Bearer, None, &headers, b"{}").is_err());
    }

    #[test]
    fn verify_signature_hmac_accepts_valid_signature() {
        use hmac::{Hmac, Mac};
        let secret = b"shared-secret";
        let body = b"{\"event\":\"ping\"}";
        let mut mac = Hmac::<Sha256>::new_from_slice(secret).unwrap();
        mac.update(body);
        let sig_hex = hex::encode(mac.finalize().into_bytes());
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-hub-signature-256",
            HeaderValue::from_str(&format!("sha256={sig_hex}")).unwrap(),
        );
        assert!(verify_signature(WebhookAuthType::Hmac, Some(secret), &headers, body).is_ok());
    }

    #[test]
    fn verify_signature_hmac_rejects_tampered_body() {
        use hmac::{Hmac, Mac};
        let secret = b"shared-secret";
        let mut mac = Hmac::<Sha256>::new_from_slice(secret).unwrap();
        mac.update(b"original");
        let sig_hex = hex::encode(mac.finalize().into_bytes());
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-hub-signature-256",
            HeaderValue::from_str(&format!("sha256={sig_hex}")).unwrap(),
        );
        assert!(verify_signature(WebhookAuthType::Hmac, Some(secret), &headers, b"tampered").is_err());
    }
}
