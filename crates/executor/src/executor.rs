//! Tool Executor (§4.6): loads a tool config, validates parameters against
//! its action schema, runs the outbound call under the tool's retry policy
//! and a per-(tenant, tool) circuit breaker, and records an audit trail.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mcp_domain::error::{CoreError, Result};
use mcp_domain::execution::{BatchCall, BatchCallResult, BatchMode, BatchResult, ExecutionRetry, ExecutionStatus, ToolExecution};
use mcp_domain::param::ParamValue;
use mcp_domain::tool_config::{AuthType, PassthroughMode, ToolConfiguration, ToolStatus};
use mcp_store::TenantScopedStore;
use mcp_vault::Vault;
use serde_json::Value;

use crate::retry::{self, FailureClass};
use crate::schema;
use crate::circuit_breaker::CircuitBreakerRegistry;

const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_BATCH_CONCURRENCY: usize = 8;

pub struct ExecuteToolRequest {
    pub tool_id: String,
    pub action: String,
    pub parameters: ParamValue,
    pub executed_by: String,
    /// User-supplied token for `passthrough_config.mode != disabled`.
    pub passthrough_token: Option<String>,
}

pub struct ExecuteToolOutcome {
    pub execution_id: String,
    pub response_time_ms: u64,
    pub retry_count: u32,
    pub result: Option<Value>,
    pub error: Option<String>,
}

struct AttemptError {
    class: FailureClass,
    message: String,
}

pub struct ToolExecutor {
    store: TenantScopedStore,
    vault: Arc<Vault>,
    http: reqwest::Client,
    breakers: Arc<CircuitBreakerRegistry>,
}

impl ToolExecutor {
    pub fn new(store: TenantScopedStore, vault: Arc<Vault>, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        Self {
            store,
            vault,
            http: reqwest::Client::new(),
            breakers,
        }
    }

    pub async fn execute_tool(&self, req: ExecuteToolRequest) -> Result<ExecuteToolOutcome> {
        let tool = self.store.get_tool_config(&req.tool_id)?;
        if tool.status != ToolStatus::Active {
            return Err(CoreError::FailedPrecondition(format!(
                "tool {} is not active",
                req.tool_id
            )));
        }

        let schema = tool
            .actions
            .get(&req.action)
            .ok_or_else(|| CoreError::NotFound(format!("unknown action {}", req.action)))?
            .clone();
        schema::validate(&schema, &req.parameters)?;

        let passthrough_token = self.resolve_passthrough(&tool, req.passthrough_token.as_deref())?;

        let tenant_id = self.store.tenant_id().to_string();
        let execution_id = uuid::Uuid::new_v4().to_string();
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let started_at = chrono::Utc::now();

        let mut execution = ToolExecution {
            id: execution_id.clone(),
            tool_config_id: tool.id.clone(),
            tenant_id: tenant_id.clone(),
            action: req.action.clone(),
            parameters: Some(req.parameters.clone()),
            status: ExecutionStatus::Pending,
            result: None,
            error: None,
            retry_count: 0,
            response_time_ms: 0,
            executed_at: started_at,
            completed_at: None,
            executed_by: req.executed_by.clone(),
            correlation_id,
        };
        self.store.insert_execution(execution.clone())?;

        if let Err(e) = self.breakers.admit(&tenant_id, &tool.id) {
            execution.status = ExecutionStatus::Failed;
            execution.error = Some(e.to_string());
            execution.completed_at = Some(chrono::Utc::now());
            self.store.update_execution(execution.clone())?;
            return Err(e);
        }

        let credentials = self.vault.decrypt(&tenant_id, &tool.credentials_encrypted)?;
        let credentials: Value = serde_json::from_slice(&credentials)?;

        let overall_start = Instant::now();
        let mut attempt: u32 = 1;
        let outcome = loop {
            execution.status = if attempt == 1 {
                ExecutionStatus::Running
            } else {
                ExecutionStatus::Retrying
            };
            self.store.update_execution(execution.clone())?;

            let attempt_result = self
                .call_once(&tool, &schema, &req.parameters, &credentials, passthrough_token.as_deref())
                .await;

            match attempt_result {
                Ok(body) => break Ok(body),
                Err(err) => {
                    let retryable = retry::is_retryable(err.class);
                    if !retryable || attempt >= tool.retry_policy.max_attempts {
                        break Err(err);
                    }
                    let delay = retry::backoff_delay(&tool.retry_policy, attempt);
                    self.store.insert_execution_retry(ExecutionRetry {
                        id: uuid::Uuid::new_v4().to_string(),
                        execution_id: execution_id.clone(),
                        attempt,
                        delay_ms: delay.as_millis() as u64,
                        error: err.message,
                        attempted_at: chrono::Utc::now(),
                    })?;
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        };

        let response_time_ms = overall_start.elapsed().as_millis() as u64;
        execution.retry_count = attempt - 1;
        execution.response_time_ms = response_time_ms;
        execution.completed_at = Some(chrono::Utc::now());

        let result = match outcome {
            Ok(body) => {
                self.breakers.record_success(&tenant_id, &tool.id);
                execution.status = ExecutionStatus::Success;
                execution.result = Some(body.clone());
                ExecuteToolOutcome {
                    execution_id: execution_id.clone(),
                    response_time_ms,
                    retry_count: execution.retry_count,
                    result: Some(body),
                    error: None,
                }
            }
            Err(err) => {
                self.breakers.record_failure(&tenant_id, &tool.id);
                execution.status = if matches!(err.class, FailureClass::Network) {
                    ExecutionStatus::Timeout
                } else {
                    ExecutionStatus::Failed
                };
                execution.error = Some(err.message.clone());
                ExecuteToolOutcome {
                    execution_id: execution_id.clone(),
                    response_time_ms,
                    retry_count: execution.retry_count,
                    result: None,
                    error: Some(err.message),
                }
            }
        };

        self.store.update_execution(execution)?;
        Ok(result)
    }

    fn resolve_passthrough(&self, tool: &ToolConfiguration, provided: Option<&str>) -> Result<Option<String>> {
        let Some(passthrough) = &tool.passthrough_config else {
            return Ok(None);
        };
        match passthrough.mode {
            PassthroughMode::Disabled => Ok(None),
            PassthroughMode::Required => provided.map(str::to_string).map(Some).ok_or_else(|| {
                CoreError::InvalidArgument("this tool requires a passthrough token".into())
            }),
            PassthroughMode::Optional => Ok(provided.map(str::to_string)),
        }
    }

    async fn call_once(
        &self,
        tool: &ToolConfiguration,
        schema: &Value,
        parameters: &ParamValue,
        credentials: &Value,
        passthrough_token: Option<&str>,
    ) -> std::result::Result<Value, AttemptError> {
        let method = schema.get("x-method").and_then(Value::as_str).unwrap_or("GET");
        let path = schema.get("x-path").and_then(Value::as_str).unwrap_or("");

        let mut params = parameters.as_object().cloned().unwrap_or_default();
        let url = substitute_path_params(&tool.base_url, path, &mut params);

        let mut builder = match method {
            "POST" => self.http.post(&url),
            "PUT" => self.http.put(&url),
            "PATCH" => self.http.patch(&url),
            "DELETE" => self.http.delete(&url),
            "HEAD" => self.http.head(&url),
            _ => self.http.get(&url),
        };

        builder = self.apply_auth(builder, tool.auth_type, credentials, passthrough_token);

        if matches!(method, "POST" | "PUT" | "PATCH") {
            let body = params
                .remove("body")
                .map(|v| v.to_json())
                .unwrap_or_else(|| Value::Object(params.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()));
            builder = builder.json(&body);
        } else {
            let query: Vec<(String, String)> = params
                .iter()
                .map(|(k, v)| (k.clone(), value_to_query_string(v)))
                .collect();
            builder = builder.query(&query);
        }

        let send = tokio::time::timeout(ATTEMPT_TIMEOUT, builder.send());
        let response = match send.await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                return Err(AttemptError {
                    class: FailureClass::Network,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(AttemptError {
                    class: FailureClass::Network,
                    message: format!("request timed out after {:?}", ATTEMPT_TIMEOUT),
                })
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError {
                class: FailureClass::Status(status.as_u16()),
                message: format!("HTTP {status}"),
            });
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        Ok(body)
    }

    fn apply_auth(
        &self,
        builder: reqwest::RequestBuilder,
        auth_type: AuthType,
        credentials: &Value,
        passthrough_token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        if let Some(token) = passthrough_token {
            return builder.bearer_auth(token);
        }
        match auth_type {
            AuthType::Token | AuthType::Oauth2 => {
                if let Some(token) = credentials.get("token").and_then(Value::as_str) {
                    return builder.bearer_auth(token);
                }
                builder
            }
            AuthType::Basic => {
                let user = credentials.get("username").and_then(Value::as_str).unwrap_or("");
                let pass = credentials.get("password").and_then(Value::as_str);
                builder.basic_auth(user, pass)
            }
            AuthType::ApiKey => {
                if let Some(key) = credentials.get("api_key").and_then(Value::as_str) {
                    return builder.header("X-API-Key", key);
                }
                builder
            }
            AuthType::Custom => {
                if let Some(headers) = credentials.get("headers").and_then(Value::as_object) {
                    let mut builder = builder;
                    for (name, value) in headers {
                        if let Some(value) = value.as_str() {
                            builder = builder.header(name.as_str(), value);
                        }
                    }
                    return builder;
                }
                builder
            }
        }
    }

    pub async fn execute_batch(
        &self,
        calls: Vec<BatchCall>,
        mode: BatchMode,
        stop_on_error: bool,
        executed_by: &str,
    ) -> Result<BatchResult> {
        let start = Instant::now();
        let results = match mode {
            BatchMode::Sequential => self.execute_sequential(calls, stop_on_error, executed_by).await,
            BatchMode::Parallel => self.execute_parallel(calls, executed_by).await,
        };

        let success_count = results.iter().filter(|r| r.error.is_none()).count() as u32;
        let error_count = results.len() as u32 - success_count;

        Ok(BatchResult {
            results,
            success_count,
            error_count,
            duration_ms: start.elapsed().as_millis() as u64,
            mode,
        })
    }

    async fn execute_sequential(
        &self,
        calls: Vec<BatchCall>,
        stop_on_error: bool,
        executed_by: &str,
    ) -> Vec<BatchCallResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let outcome = self.execute_tool(ExecuteToolRequest {
                tool_id: call.tool_id,
                action: call.action,
                parameters: call.parameters,
                executed_by: executed_by.to_string(),
                passthrough_token: None,
            }).await;

            let stop = matches!(&outcome, Err(_)) && stop_on_error;
            results.push(to_batch_result(outcome));
            if stop {
                break;
            }
        }
        results
    }

    async fn execute_parallel(&self, calls: Vec<BatchCall>, executed_by: &str) -> Vec<BatchCallResult> {
        use futures_util::stream::{self, StreamExt};

        let indexed: Vec<(usize, BatchCall)> = calls.into_iter().enumerate().collect();
        let mut indexed_results: Vec<(usize, BatchCallResult)> = stream::iter(indexed.into_iter().map(|(idx, call)| {
            let executed_by = executed_by.to_string();
            async move {
                let outcome = self.execute_tool(ExecuteToolRequest {
                    tool_id: call.tool_id,
                    action: call.action,
                    parameters: call.parameters,
                    executed_by,
                    passthrough_token: None,
                }).await;
                (idx, to_batch_result(outcome))
            }
        }))
        .buffer_unordered(DEFAULT_BATCH_CONCURRENCY)
        .collect()
        .await;

        indexed_results.sort_by_key(|(idx, _)| *idx);
        indexed_results.into_iter().map(|(_, r)| r).collect()
    }
}

fn to_batch_result(outcome: Result<ExecuteToolOutcome>) -> BatchCallResult {
    match outcome {
        Ok(o) => BatchCallResult {
            result: o.result,
            error: o.error,
            execution_id: o.execution_id,
        },
        Err(e) => BatchCallResult {
            result: None,
            error: Some(e.to_string()),
            execution_id: String::new(),
        },
    }
}

fn substitute_path_params(base_url: &str, path: &str, params: &mut BTreeMap<String, ParamValue>) -> String {
    let mut resolved = path.to_string();
    let keys: Vec<String> = params.keys().cloned().collect();
    for key in keys {
        let placeholder = format!("{{{key}}}");
        if resolved.contains(&placeholder) {
            if let Some(value) = params.remove(&key) {
                resolved = resolved.replace(&placeholder, &value_to_query_string(&value));
            }
        }
    }
    format!("{}{}", base_url.trim_end_matches('/'), resolved)
}

fn value_to_query_string(value: &ParamValue) -> String {
    match value {
        ParamValue::String(s) => s.clone(),
        ParamValue::Int(i) => i.to_string(),
        ParamValue::Float(f) => f.to_string(),
        ParamValue::Bool(b) => b.to_string(),
        other => other.to_json().to_string(),
    }
}
