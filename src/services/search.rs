//! Web search used to give the decision maker some outside context

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Snippets for a query, most relevant first
#[async_trait]
pub trait SearchHandler: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<String>>;
}

/// One canned result per query
#[derive(Debug, Default, Clone)]
pub struct MockSearchHandler;

#[async_trait]
impl SearchHandler for MockSearchHandler {
    async fn search(&self, query: &str) -> Result<Vec<String>> {
        Ok(vec![format!("Search result for: {}", query)])
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingResponse {
    #[serde(default)]
    web_pages: Option<WebPages>,
}

#[derive(Debug, Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebPage {
    snippet: String,
    #[serde(default)]
    date_published_display_text: Option<String>,
}

impl WebPage {
    fn into_snippet(self) -> String {
        match self.date_published_display_text {
            Some(date) => format!("{} (Date published: {})", self.snippet, date),
            None => self.snippet,
        }
    }
}

/// Bing Web Search v7 client
pub struct BingSearchHandler {
    client: Client,
    search_url: String,
    api_key: String,
    results_per_query: u32,
}

impl BingSearchHandler {
    pub fn new(client: Client, search_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            search_url: search_url.into(),
            api_key: api_key.into(),
            results_per_query: 5,
        }
    }

    /// Quoted queries restrict results too much, so quotes are dropped
    fn clean_query(query: &str) -> String {
        query.replace(['"', '\''], "")
    }
}

#[async_trait]
impl SearchHandler for BingSearchHandler {
    async fn search(&self, query: &str) -> Result<Vec<String>> {
        let query = Self::clean_query(query);
        debug!("Searching: {}", query);

        let res = self
            .client
            .get(&self.search_url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .query(&[("q", query.clone()), ("count", self.results_per_query.to_string())])
            .send()
            .await
            .context("Search request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("Search API error ({}) for {:?}: {}", status, query, body);
        }

        let parsed: BingResponse = res.json().await.context("Failed to parse search response")?;
        Ok(parse_snippets(parsed))
    }
}

fn parse_snippets(response: BingResponse) -> Vec<String> {
    response
        .web_pages
        .map(|pages| pages.value.into_iter().map(WebPage::into_snippet).collect())
        .unwrap_or_default()
}
