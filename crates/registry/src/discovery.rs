//! OpenAPI probing for `DiscoverTool` (§4.5). Candidate paths are seeded by
//! a tenant-independent [`DiscoveryPattern`] learned from prior successful
//! discoveries against the same domain, then the fixed fallback list.
//! Probes run with bounded concurrency and an overall deadline, mirroring
//! this repo's `futures_util::future::join_all` concurrent-fan-out idiom
//! but capped via `buffer_unordered` rather than joining everything at once.

use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use mcp_domain::tool_config::{DiscoveryPattern, DiscoverySessionStatus, FALLBACK_DISCOVERY_PATHS};

const MAX_CONCURRENCY: usize = 4;
const GLOBAL_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DiscoveryOutcome {
    pub status: DiscoverySessionStatus,
    pub discovered_urls: Vec<String>,
}

pub struct Discoverer {
    http: reqwest::Client,
}

impl Discoverer {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(PROBE_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn candidate_paths(pattern: Option<&DiscoveryPattern>) -> Vec<String> {
        let mut paths: Vec<String> = pattern
            .map(|p| p.successful_paths.clone())
            .unwrap_or_default();
        for fallback in FALLBACK_DISCOVERY_PATHS {
            if !paths.iter().any(|p| p == fallback) {
                paths.push((*fallback).to_string());
            }
        }
        paths
    }

    /// Probes `base_url` + each candidate path concurrently (bounded to
    /// [`MAX_CONCURRENCY`]), within an overall [`GLOBAL_TIMEOUT`]. Paths that
    /// respond with a successful status are recorded as discovered.
    pub async fn discover(&self, base_url: &str, pattern: Option<&DiscoveryPattern>) -> DiscoveryOutcome {
        let paths = Self::candidate_paths(pattern);
        let urls: Vec<String> = paths
            .iter()
            .map(|p| format!("{}{}", base_url.trim_end_matches('/'), p))
            .collect();

        let probes = stream::iter(urls.into_iter().map(|url| {
            let http = self.http.clone();
            async move {
                let ok = http
                    .get(&url)
                    .send()
                    .await
                    .map(|resp| resp.status().is_success())
                    .unwrap_or(false);
                (url, ok)
            }
        }))
        .buffer_unordered(MAX_CONCURRENCY)
        .collect::<Vec<_>>();

        let results = match tokio::time::timeout(GLOBAL_TIMEOUT, probes).await {
            Ok(results) => results,
            Err(_) => {
                tracing::warn!(base_url, "discovery probing timed out before all candidates completed");
                Vec::new()
            }
        };

        let discovered: Vec<String> = results
            .into_iter()
            .filter_map(|(url, ok)| ok.then_some(url))
            .collect();

        let status = if discovered.is_empty() {
            DiscoverySessionStatus::Failed
        } else if discovered.len() == 1 {
            DiscoverySessionStatus::Discovered
        } else {
            DiscoverySessionStatus::Partial
        };

        DiscoveryOutcome {
            status,
            discovered_urls: discovered,
        }
    }
}

impl Default for Discoverer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_paths_prefers_learned_pattern_then_fallbacks() {
        let pattern = DiscoveryPattern {
            domain: "api.github.com".into(),
            successful_paths: vec!["/openapi/v2.json".into()],
            auth_method: None,
            api_format: None,
            success_count: 3,
            last_updated: chrono::Utc::now(),
        };
        let paths = Discoverer::candidate_paths(Some(&pattern));
        assert_eq!(paths[0], "/openapi/v2.json");
        assert!(paths.contains(&"/openapi.json".to_string()));
    }

    #[test]
    fn candidate_paths_dedupes_pattern_against_fallbacks() {
        let pattern = DiscoveryPattern {
            domain: "x".into(),
            successful_paths: vec!["/openapi.json".into()],
            auth_method: None,
            api_format: None,
            success_count: 1,
            last_updated: chrono::Utc::now(),
        };
        let paths = Discoverer::candidate_paths(Some(&pattern));
        assert_eq!(paths.iter().filter(|p| *p == "/openapi.json").count(), 1);
    }
}
