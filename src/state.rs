use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use crate::agent::ResearchEngine;

/// Research loop parameters. Loaded from the environment at startup;
/// admins can change `max_rounds` at runtime.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    pub max_rounds: u32,
    pub max_initial_queries: usize,
    pub max_fallback_queries: usize,
    pub search_timeout_secs: u64,
    pub results_per_query: u32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_rounds: 2,
            max_initial_queries: 5,
            max_fallback_queries: 3,
            search_timeout_secs: 15,
            results_per_query: 5,
        }
    }
}

impl ResearchConfig {
    /// Defaults overridden by `RESEARCH_*` variables where set and valid.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_rounds: env_or("RESEARCH_MAX_ROUNDS", defaults.max_rounds),
            max_initial_queries: env_or("RESEARCH_MAX_QUERIES", defaults.max_initial_queries),
            max_fallback_queries: env_or(
                "RESEARCH_MAX_FALLBACK_QUERIES",
                defaults.max_fallback_queries,
            ),
            search_timeout_secs: env_or(
                "RESEARCH_SEARCH_TIMEOUT_SECS",
                defaults.search_timeout_secs,
            ),
            results_per_query: env_or("RESEARCH_RESULTS_PER_QUERY", defaults.results_per_query),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match dotenv::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Ignoring unparseable config value");
            default
        }),
        Err(_) => default,
    }
}

pub struct AppState {
    pub engine: Arc<ResearchEngine>,
    pub admin_ids: HashSet<u64>,
    pub config: Arc<RwLock<ResearchConfig>>,
}

impl AppState {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_parses_and_falls_back() {
        std::env::set_var("RESEARCH_TEST_ROUNDS", " 4 ");
        assert_eq!(env_or("RESEARCH_TEST_ROUNDS", 2u32), 4);

        std::env::set_var("RESEARCH_TEST_BAD", "many");
        assert_eq!(env_or("RESEARCH_TEST_BAD", 2u32), 2);

        assert_eq!(env_or("RESEARCH_TEST_UNSET_KEY", 7usize), 7);
    }

    #[test]
    fn test_defaults() {
        let config = ResearchConfig::default();
        assert_eq!(config.max_rounds, 2);
        assert_eq!(config.max_initial_queries, 5);
        assert_eq!(config.max_fallback_queries, 3);
    }
}
