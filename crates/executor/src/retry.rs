//! Retryable-error classification and backoff, the direct analog of
//! `LlmRouter::is_retriable` + its timeout wrapper, generalized from
//! "retry an LLM call against a fallback model" to "retry the same tool
//! call against the same endpoint with backoff".

use std::time::Duration;

use mcp_domain::tool_config::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Connect error, DNS failure, or the per-attempt deadline elapsed.
    Network,
    Status(u16),
    /// The response body didn't match what the action's schema implies.
    SchemaMismatch,
    Cancelled,
}

pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || status == 408 || (500..=599).contains(&status)
}

pub fn is_retryable(class: FailureClass) -> bool {
    match class {
        FailureClass::Network => true,
        FailureClass::Status(status) => is_retryable_status(status),
        FailureClass::SchemaMismatch | FailureClass::Cancelled => false,
    }
}

/// `initial_delay * multiplier^(attempt-1)`, capped at `max_delay`, with
/// +/- `jitter` fraction applied.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = policy.initial_delay_ms as f64 * policy.multiplier.powi(attempt as i32 - 1);
    let capped = base.min(policy.max_delay_ms as f64).max(0.0);
    let jitter_range = capped * policy.jitter;
    let jitter = if jitter_range > 0.0 {
        rand::random::<f64>() * 2.0 * jitter_range - jitter_range
    } else {
        0.0
    };
    Duration::from_millis((capped + jitter).max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_and_5xx_are_retryable() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(408));
    }

    #[test]
    fn other_4xx_are_not_retryable() {
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(409));
    }

    #[test]
    fn schema_mismatch_and_cancelled_never_retry() {
        assert!(!is_retryable(FailureClass::SchemaMismatch));
        assert!(!is_retryable(FailureClass::Cancelled));
    }

    #[test]
    fn backoff_grows_and_respects_cap() {
        let policy = RetryPolicy {
            initial_delay_ms: 1_000,
            max_delay_ms: 3_000,
            multiplier: 2.0,
            jitter: 0.0,
            max_attempts: 5,
        };
        assert_eq!(backoff_delay(&policy, 1), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(&policy, 2), Duration::from_millis(2_000));
        assert_eq!(backoff_delay(&policy, 3), Duration::from_millis(3_000));
        assert_eq!(backoff_delay(&policy, 10), Duration::from_millis(3_000));
    }
}
