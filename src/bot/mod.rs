//! Betting bot: market lookup, optional web search, and a decision

pub mod market_fetcher;
pub mod prompts;
pub mod runner;

pub use market_fetcher::{HttpMarketFetcher, MarketFetcher, MockMarketFetcher};
pub use runner::{parse_market_line, process_markets_file, RunSummary};

use crate::services::{Llm, SearchHandler};
use crate::strategies::DecisionMaker;
use crate::types::{Decision, MarketData};
use anyhow::{Context, Result};
use prompts::SearchResults;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const MAX_SEARCH_QUERIES: usize = 3;

pub struct Bot {
    decision_maker: Arc<dyn DecisionMaker>,
    market_fetcher: Arc<dyn MarketFetcher>,
    search_handler: Option<Arc<dyn SearchHandler>>,
    query_llm: Option<Arc<dyn Llm>>,
}

impl Bot {
    pub fn new(decision_maker: Arc<dyn DecisionMaker>, market_fetcher: Arc<dyn MarketFetcher>) -> Self {
        Self {
            decision_maker,
            market_fetcher,
            search_handler: None,
            query_llm: None,
        }
    }

    pub fn with_search(mut self, search_handler: Arc<dyn SearchHandler>) -> Self {
        self.search_handler = Some(search_handler);
        self
    }

    /// Model asked for search queries; without one, title-based queries are used
    pub fn with_query_llm(mut self, llm: Arc<dyn Llm>) -> Self {
        self.query_llm = Some(llm);
        self
    }

    /// Queries from the model's `search_queries` field, if it gave any
    fn queries_from_json(value: &Value) -> Option<Vec<String>> {
        let queries: Vec<String> = value
            .get("search_queries")?
            .as_array()?
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .take(MAX_SEARCH_QUERIES)
            .map(str::to_string)
            .collect();
        (!queries.is_empty()).then_some(queries)
    }

    async fn search_queries(&self, market: &MarketData) -> Vec<String> {
        if let Some(llm) = &self.query_llm {
            let prompt = prompts::search_query_prompt(market);
            match llm.sample_json(&prompt).await {
                Ok(value) => {
                    if let Some(queries) = Self::queries_from_json(&value) {
                        return queries;
                    }
                    debug!("{} gave no search queries; using title", llm.name());
                }
                Err(e) => warn!("Search query generation failed for {}: {:#}", market.id, e),
            }
        }
        prompts::fallback_search_queries(&market.title)
    }

    async fn search_results(&self, market: &MarketData) -> Result<SearchResults> {
        let Some(handler) = &self.search_handler else {
            return Ok(Vec::new());
        };

        let mut results = Vec::new();
        for query in self.search_queries(market).await {
            let snippets = handler
                .search(&query)
                .await
                .with_context(|| format!("Search failed for {:?}", query))?;
            results.push((query, snippets));
        }
        Ok(results)
    }

    /// Decide on one market. The fetched market data comes back too, so
    /// callers can bet on its id without a second lookup.
    pub async fn get_decision_for_market(&self, url: &str) -> Result<(Decision, MarketData)> {
        let market = self.market_fetcher.get_market_data(url).await?;
        let search_results = self.search_results(&market).await?;
        let prompt = prompts::final_decision_prompt(&market, &search_results);

        debug!(
            "Asking {} decision maker about {} ({} chars)",
            self.decision_maker.name(),
            market.id,
            prompt.len()
        );
        let decision = self.decision_maker.make_decision(&market, &prompt).await?;
        Ok((decision, market))
    }
}
