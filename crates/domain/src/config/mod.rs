mod rate_limit;
mod server;
mod store;
mod tools;
mod vault;
mod webhooks;

pub use rate_limit::RateLimitConfig;
pub use server::{CorsConfig, ServerConfig};
pub use store::StoreConfig;
pub use tools::ToolsConfig;
pub use vault::VaultConfig;
pub use webhooks::WebhooksConfig;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub webhooks: WebhooksConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Warning => "WARN",
            ConfigSeverity::Error => "ERROR",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut issues = Vec::new();

        if self.server.port == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must not be 0".into(),
            });
        }
        if self.server.host.trim().is_empty() {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.server.max_message_size_bytes == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.max_message_size_bytes".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self
            .server
            .cors
            .allowed_origins
            .iter()
            .any(|o| o == "*")
        {
            issues.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard origin allows any site to call the API".into(),
            });
        }

        if self.vault.master_secret_env.trim().is_empty() {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "vault.master_secret_env".into(),
                message: "must name an environment variable".into(),
            });
        }
        if self.vault.key_version == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "vault.key_version".into(),
                message: "key_version must start at 1".into(),
            });
        }

        if self.tools.default_retry_policy.max_attempts == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "tools.default_retry_policy.max_attempts".into(),
                message: "must allow at least one attempt".into(),
            });
        }
        if self.tools.circuit_breaker_threshold == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "tools.circuit_breaker_threshold".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.tools.discovery_concurrency == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "tools.discovery_concurrency".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.webhooks.dedup_window_secs == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "webhooks.dedup_window_secs".into(),
                message: "0 disables deduplication entirely".into(),
            });
        }

        if self.rate_limit.requests_per_second == 0 {
            issues.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "rate_limit.requests_per_second".into(),
                message: "must be greater than 0".into(),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(valid_config().validate().is_empty());
    }

    #[test]
    fn server_port_zero_is_error() {
        let mut c = valid_config();
        c.server.port = 0;
        let issues = c.validate();
        assert!(issues.iter().any(|i| i.field == "server.port" && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn server_host_empty_is_error() {
        let mut c = valid_config();
        c.server.host = "".into();
        let issues = c.validate();
        assert!(issues.iter().any(|i| i.field == "server.host"));
    }

    #[test]
    fn cors_wildcard_is_warning() {
        let mut c = valid_config();
        c.server.cors.allowed_origins = vec!["*".into()];
        let issues = c.validate();
        let issue = issues.iter().find(|i| i.field == "server.cors.allowed_origins").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn vault_master_secret_env_empty_is_error() {
        let mut c = valid_config();
        c.vault.master_secret_env = "".into();
        assert!(c.validate().iter().any(|i| i.field == "vault.master_secret_env"));
    }

    #[test]
    fn retry_policy_zero_attempts_is_error() {
        let mut c = valid_config();
        c.tools.default_retry_policy.max_attempts = 0;
        assert!(c
            .validate()
            .iter()
            .any(|i| i.field == "tools.default_retry_policy.max_attempts"));
    }

    #[test]
    fn webhook_dedup_window_zero_is_warning() {
        let mut c = valid_config();
        c.webhooks.dedup_window_secs = 0;
        let issue = c
            .validate()
            .into_iter()
            .find(|i| i.field == "webhooks.dedup_window_secs")
            .unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn rate_limit_zero_rps_is_error() {
        let mut c = valid_config();
        c.rate_limit.requests_per_second = 0;
        assert!(c.validate().iter().any(|i| i.field == "rate_limit.requests_per_second"));
    }

    #[test]
    fn config_error_display_format() {
        let e = ConfigError {
            severity: ConfigSeverity::Error,
            field: "server.port".into(),
            message: "port must not be 0".into(),
        };
        assert_eq!(e.to_string(), "[ERROR] server.port: port must not be 0");
    }
}
