//! Configuration management for the Manifold bot

use crate::services::RetryConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Bot configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Manifold API base URL (no trailing slash)
    pub manifold_api_url: String,

    /// OpenAI-compatible API base URL
    pub openai_api_url: String,

    /// Bing web search endpoint
    pub bing_search_url: String,

    /// API keys; `--*-key-path` files take precedence over these
    pub manifold_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub bing_api_key: Option<String>,

    /// Timeout applied to every HTTP request
    pub http_timeout_seconds: u64,

    /// Retry policy for listing and tag fetches (default: 12 attempts, 5s apart)
    pub retry: RetryConfig,

    /// Mana staked per bet
    pub bet_amount: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifold_api_url: ManifoldApi::BASE_URL.to_string(),
            openai_api_url: "https://api.openai.com/v1".to_string(),
            bing_search_url: "https://api.bing.microsoft.com/v7.0/search".to_string(),
            manifold_api_key: None,
            openai_api_key: None,
            bing_api_key: None,
            http_timeout_seconds: 30,
            retry: RetryConfig::default(),
            bet_amount: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let manifold_api_url = env::var("MANIFOLD_API_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.manifold_api_url);

        let openai_api_url = env::var("OPENAI_API_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.openai_api_url);

        let bing_search_url = env::var("BING_SEARCH_URL").unwrap_or(defaults.bing_search_url);

        let manifold_api_key = env::var("MANIFOLD_API_KEY").ok().filter(|s| !s.is_empty());
        let openai_api_key = env::var("OPENAI_API_KEY").ok().filter(|s| !s.is_empty());
        let bing_api_key = env::var("BING_API_KEY").ok().filter(|s| !s.is_empty());

        let http_timeout_seconds = parse_var("HTTP_TIMEOUT_SECONDS")?
            .unwrap_or(defaults.http_timeout_seconds);

        let max_attempts = parse_var("FETCH_RETRY_ATTEMPTS")?
            .unwrap_or(defaults.retry.max_attempts);

        let delay_seconds: u64 = parse_var("FETCH_RETRY_DELAY_SECONDS")?
            .unwrap_or(defaults.retry.delay.as_secs());

        let bet_amount = parse_var("BET_AMOUNT")?.unwrap_or(defaults.bet_amount);

        // Validate configuration
        if max_attempts == 0 {
            anyhow::bail!("FETCH_RETRY_ATTEMPTS must be at least 1");
        }
        if bet_amount == 0 {
            anyhow::bail!("BET_AMOUNT must be at least 1");
        }

        Ok(Self {
            manifold_api_url,
            openai_api_url,
            bing_search_url,
            manifold_api_key,
            openai_api_key,
            bing_api_key,
            http_timeout_seconds,
            retry: RetryConfig {
                max_attempts,
                delay: Duration::from_secs(delay_seconds),
            },
            bet_amount,
        })
    }

    /// Build an HTTP client with the configured timeout
    pub fn http_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.http_timeout_seconds))
            .build()
            .context("Failed to create HTTP client")
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", name, raw, e)),
        _ => Ok(None),
    }
}

/// Read an API key from a file, trimming surrounding whitespace
pub fn read_key_file(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read key file {}", path.display()))?;
    let key = raw.trim().to_string();
    if key.is_empty() {
        anyhow::bail!("Key file {} is empty", path.display());
    }
    Ok(key)
}

/// Pick a key from its file (if given) or the environment value
pub fn resolve_key(path: Option<&Path>, from_env: Option<&str>, name: &str) -> Result<String> {
    if let Some(path) = path {
        return read_key_file(path);
    }
    from_env
        .map(str::to_string)
        .with_context(|| format!("{} key required: pass a key path or set it in the environment", name))
}

/// Manifold API endpoints
pub struct ManifoldApi;

impl ManifoldApi {
    pub const BASE_URL: &'static str = "https://api.manifold.markets/v0";

    pub fn search_markets_url(base: &str) -> String {
        format!("{}/search-markets", base)
    }

    pub fn market_url(base: &str, market_id: &str) -> String {
        format!("{}/market/{}", base, urlencoding::encode(market_id))
    }

    pub fn slug_url(base: &str, slug: &str) -> String {
        format!("{}/slug/{}", base, urlencoding::encode(slug))
    }

    pub fn comments_url(base: &str) -> String {
        format!("{}/comments", base)
    }

    pub fn bet_url(base: &str) -> String {
        format!("{}/bet", base)
    }
}
