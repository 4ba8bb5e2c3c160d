//! Per-(tenant, tool) circuit breaker (§4.6 step 6, §5 "circuit-breaker
//! state is per-(tenant, tool) and thread-safe; readers use a lightweight
//! read-mostly pattern"). Grounded on this repo's existing `parking_lot`
//! guarded-map idiom (the same shape as `mcp-store`'s in-memory registries)
//! rather than a new synchronization primitive.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use mcp_domain::error::{CoreError, Result};
use parking_lot::Mutex;

const DEFAULT_THRESHOLD: u32 = 5;
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Entry {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            state: State::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }
}

pub struct CircuitBreakerRegistry {
    threshold: u32,
    cooldown: Duration,
    entries: Mutex<HashMap<(String, String), Entry>>,
}

impl CircuitBreakerRegistry {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn key(tenant_id: &str, tool_id: &str) -> (String, String) {
        (tenant_id.to_string(), tool_id.to_string())
    }

    /// Call before attempting a tool call. Transitions `Open -> HalfOpen`
    /// once the cooldown has elapsed and lets exactly that one probe
    /// through; otherwise serves `Unavailable` without attempting the call.
    pub fn admit(&self, tenant_id: &str, tool_id: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(Self::key(tenant_id, tool_id)).or_default();

        match entry.state {
            State::Closed | State::HalfOpen => Ok(()),
            State::Open => {
                let elapsed = entry.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.cooldown {
                    entry.state = State::HalfOpen;
                    Ok(())
                } else {
                    Err(CoreError::Unavailable(format!(
                        "tool {tool_id} circuit breaker is open, retry after cooldown"
                    )))
                }
            }
        }
    }

    pub fn record_success(&self, tenant_id: &str, tool_id: &str) {
        let mut entries = self.entries.lock();
        let entry = entries.entry(Self::key(tenant_id, tool_id)).or_default();
        entry.state = State::Closed;
        entry.consecutive_failures = 0;
        entry.opened_at = None;
    }

    pub fn record_failure(&self, tenant_id: &str, tool_id: &str) {
        let mut entries = self.entries.lock();
        let entry = entries.entry(Self::key(tenant_id, tool_id)).or_default();
        entry.consecutive_failures += 1;
        if entry.state == State::HalfOpen || entry.consecutive_failures >= self.threshold {
            entry.state = State::Open;
            entry.opened_at = Some(Instant::now());
        }
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_COOLDOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreakerRegistry::new(3, Duration::from_secs(30));
        for _ in 0..2 {
            breaker.record_failure("t1", "tool1");
        }
        assert!(breaker.admit("t1", "tool1").is_ok());
        breaker.record_failure("t1", "tool1");
        assert!(breaker.admit("t1", "tool1").is_err());
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = CircuitBreakerRegistry::new(3, Duration::from_secs(30));
        breaker.record_failure("t1", "tool1");
        breaker.record_failure("t1", "tool1");
        breaker.record_success("t1", "tool1");
        breaker.record_failure("t1", "tool1");
        assert!(breaker.admit("t1", "tool1").is_ok());
    }

    #[test]
    fn half_opens_after_cooldown() {
        let breaker = CircuitBreakerRegistry::new(1, Duration::from_millis(1));
        breaker.record_failure("t1", "tool1");
        assert!(breaker.admit("t1", "tool1").is_err());
        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.admit("t1", "tool1").is_ok());
    }

    #[test]
    fn breakers_are_isolated_per_tool() {
        let breaker = CircuitBreakerRegistry::new(1, Duration::from_secs(30));
        breaker.record_failure("t1", "tool1");
        assert!(breaker.admit("t1", "tool1").is_err());
        assert!(breaker.admit("t1", "tool2").is_ok());
    }
}
