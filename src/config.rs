use anyhow::{bail, Result};
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "data/xrank.db";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: String,
    pub graphql_url: String,
    pub bearer_token: String,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub log_dir: String,
    pub run_once: bool,
    pub ntfy_topic: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secs = |key: &str, default: u64| -> u64 {
            get(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        let Some(graphql_url) = get("SPLATNET_GRAPHQL_URL").filter(|v| !v.is_empty()) else {
            bail!("SPLATNET_GRAPHQL_URL is not set");
        };
        let Some(bearer_token) = get("SPLATNET_BEARER_TOKEN").filter(|v| !v.is_empty()) else {
            bail!("SPLATNET_BEARER_TOKEN is not set");
        };

        Ok(Self {
            db_path: get("XRANK_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            graphql_url,
            bearer_token,
            poll_interval: Duration::from_secs(secs("XRANK_POLL_INTERVAL_SECS", 300)),
            http_timeout: Duration::from_secs(secs("XRANK_HTTP_TIMEOUT_SECS", 30)),
            log_dir: get("XRANK_LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            run_once: get("XRANK_RUN_ONCE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            ntfy_topic: get("XRANK_NTFY_TOPIC").filter(|v| !v.is_empty()),
        })
    }
}
