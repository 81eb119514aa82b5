//! Market lookup by URL

use crate::config::{Config, ManifoldApi};
use crate::types::{Comment, MarketData};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Most recent comments included in a prompt
const COMMENT_LIMIT: usize = 20;

#[async_trait]
pub trait MarketFetcher: Send + Sync {
    async fn get_market_data(&self, url: &str) -> Result<MarketData>;
}

/// Last path segment of a market URL, ignoring query and fragment
pub fn slug_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMarket {
    id: String,
    question: String,
    #[serde(default)]
    creator_name: Option<String>,
    #[serde(default)]
    text_description: Option<String>,
    #[serde(default)]
    probability: Option<f64>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    close_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiComment {
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    user_username: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_time: DateTime<Utc>,
}

/// Concatenate the `text` leaves of a rich-text document
fn flatten_rich_text(node: &Value, out: &mut String) {
    if let Some(text) = node.get("text").and_then(Value::as_str) {
        out.push_str(text);
    }
    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            flatten_rich_text(child, out);
        }
        if node.get("type").and_then(Value::as_str) == Some("paragraph") {
            out.push(' ');
        }
    }
}

impl ApiComment {
    fn into_comment(self) -> Comment {
        let text = match (self.text, self.content) {
            (Some(text), _) => text,
            (None, Some(content)) => {
                let mut flat = String::new();
                flatten_rich_text(&content, &mut flat);
                flat.trim().to_string()
            }
            (None, None) => String::new(),
        };
        Comment {
            user: self
                .user_name
                .or(self.user_username)
                .unwrap_or_else(|| "anonymous".to_string()),
            text,
            time: self.created_time,
        }
    }
}

/// Fetches markets and their comments from the Manifold API
pub struct HttpMarketFetcher {
    client: Client,
    base_url: String,
}

impl HttpMarketFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            base_url: config.manifold_api_url.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        debug!("GET {} {:?}", url, query);
        let res = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {} from {}: {}", status, url, body);
        }
        res.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    async fn get_comments(&self, market_id: &str) -> Result<Vec<Comment>> {
        let comments: Vec<ApiComment> = self
            .get_json(
                &ManifoldApi::comments_url(&self.base_url),
                &[
                    ("contractId", market_id.to_string()),
                    ("limit", COMMENT_LIMIT.to_string()),
                ],
            )
            .await?;
        Ok(comments.into_iter().map(ApiComment::into_comment).collect())
    }
}

#[async_trait]
impl MarketFetcher for HttpMarketFetcher {
    async fn get_market_data(&self, url: &str) -> Result<MarketData> {
        let slug = slug_from_url(url).ok_or_else(|| anyhow!("No market slug in URL {}", url))?;
        let market: ApiMarket = self
            .get_json(&ManifoldApi::slug_url(&self.base_url, slug), &[])
            .await
            .with_context(|| format!("Failed to fetch market {}", slug))?;

        // Comments only enrich the prompt
        let comments = match self.get_comments(&market.id).await {
            Ok(comments) => comments,
            Err(e) => {
                warn!("Failed to fetch comments for {}: {:#}", market.id, e);
                Vec::new()
            }
        };

        Ok(MarketData {
            id: market.id,
            title: market.question,
            creator: market.creator_name.unwrap_or_default(),
            description: market.text_description.unwrap_or_default(),
            probability: market.probability.unwrap_or(0.5),
            current_date: Utc::now(),
            close_date: market.close_time,
            comments,
        })
    }
}

/// Picks one of two canned markets, whatever the URL
pub struct MockMarketFetcher {
    rng: Mutex<StdRng>,
}

impl MockMarketFetcher {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn mock_markets(now: DateTime<Utc>) -> [MarketData; 2] {
        let comment = |user: &str, text: &str| Comment {
            user: user.to_string(),
            text: text.to_string(),
            time: now,
        };
        [
            MarketData {
                id: "1".to_string(),
                title: "Will AI surpass human intelligence by 2030?".to_string(),
                creator: "Bob".to_string(),
                description: "This market will resolve to YES if a widely recognized AI system demonstrably outperforms humans across a broad range of cognitive tasks by December 31, 2030.".to_string(),
                probability: 0.7,
                current_date: now,
                close_date: Some(now),
                comments: vec![
                    comment("Alice", "I think this is unlikely given current progress."),
                    comment("Bob", "Recent advancements in language models suggest this might happen sooner than we think."),
                ],
            },
            MarketData {
                id: "2".to_string(),
                title: "Will SpaceX successfully land humans on Mars by 2028?".to_string(),
                creator: "Charlie".to_string(),
                description: "This market resolves to YES if SpaceX lands at least one human safely on the surface of Mars before January 1, 2029.".to_string(),
                probability: 0.3,
                current_date: now,
                close_date: Some(now),
                comments: vec![
                    comment("Alice", "There are still many technological hurdles to overcome."),
                    comment("Bob", "SpaceX has been making rapid progress"),
                ],
            },
        ]
    }
}

impl Default for MockMarketFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketFetcher for MockMarketFetcher {
    async fn get_market_data(&self, _url: &str) -> Result<MarketData> {
        let markets = Self::mock_markets(Utc::now());
        let mut rng = self.rng.lock().map_err(|_| anyhow!("RNG lock poisoned"))?;
        markets
            .choose(&mut *rng)
            .cloned()
            .ok_or_else(|| anyhow!("No mock markets"))
    }
}
