//! Market listing source for the Manifold API
//!
//! The selection pipeline only ever talks to a [`ListingSource`]; the HTTP
//! implementation here wraps every call in the fixed-delay retry policy.

use crate::config::{Config, ManifoldApi};
use crate::services::{with_retry, ApiError, RetryConfig};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

/// Largest page the listing endpoint will serve
pub const MAX_PAGE_LENGTH: usize = 1000;

/// One page request against the listing endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub offset: usize,
    pub limit: usize,
}

impl FetchRequest {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

/// Raw listing entry, sorted by close time on the server side
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedMarket {
    pub id: String,
    pub url: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub close_time: DateTime<Utc>,
    pub unique_bettor_count: u32,
}

/// Detail record; only the category labels matter here
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketDetail {
    #[serde(default)]
    group_slugs: Option<Vec<String>>,
}

/// Source of open binary markets in ascending close-time order
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one page of open binary markets sorted by close date
    async fn fetch_page(&self, request: FetchRequest) -> Result<Vec<ListedMarket>, ApiError>;

    /// Fetch the category labels of a single market
    async fn fetch_tags(&self, market_id: &str) -> Result<HashSet<String>, ApiError>;
}

/// HTTP listing source backed by the Manifold API
pub struct ManifoldScanner {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl ManifoldScanner {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            base_url: config.manifold_api_url.clone(),
            retry: config.retry.clone(),
        })
    }

    /// Single GET attempt, classified into an `ApiError` on failure
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::from_network_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_response(status.as_u16(), url, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_network_error(&e))?;

        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ListingSource for ManifoldScanner {
    async fn fetch_page(&self, request: FetchRequest) -> Result<Vec<ListedMarket>, ApiError> {
        if request.limit == 0 || request.limit > MAX_PAGE_LENGTH {
            return Err(ApiError::InvalidRequest(format!(
                "page limit {} outside 1..={}",
                request.limit, MAX_PAGE_LENGTH
            )));
        }

        let url = ManifoldApi::search_markets_url(&self.base_url);
        let query = [
            ("term", String::new()),
            ("limit", request.limit.to_string()),
            ("offset", request.offset.to_string()),
            ("filter", "open".to_string()),
            ("sort", "close-date".to_string()),
            ("contractType", "BINARY".to_string()),
        ];

        let operation = format!("listing page at offset {}", request.offset);
        let page: Vec<ListedMarket> =
            with_retry(&self.retry, &operation, || self.get_json(&url, &query)).await?;

        debug!("Fetched {} markets at offset {}", page.len(), request.offset);
        Ok(page)
    }

    async fn fetch_tags(&self, market_id: &str) -> Result<HashSet<String>, ApiError> {
        let url = ManifoldApi::market_url(&self.base_url, market_id);
        let operation = format!("tags for market {}", market_id);

        let detail: MarketDetail =
            with_retry(&self.retry, &operation, || self.get_json(&url, &[])).await?;

        Ok(detail.group_slugs.unwrap_or_default().into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_listed_market() {
        let json = r#"[{
            "id": "abc",
            "url": "https://manifold.markets/alice/will-it-rain",
            "closeTime": 1735862400000,
            "uniqueBettorCount": 14,
            "question": "Will it rain?"
        }]"#;
        let page: Vec<ListedMarket> = serde_json::from_str(json).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "abc");
        assert_eq!(page[0].unique_bettor_count, 14);
        assert_eq!(
            page[0].close_time,
            Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_listed_market_requires_bettor_count() {
        let json = r#"[{"id": "abc", "url": "u", "closeTime": 1735862400000}]"#;
        let err = serde_json::from_str::<Vec<ListedMarket>>(json).unwrap_err();
        assert!(err.to_string().contains("uniqueBettorCount"));
    }

    #[test]
    fn test_parse_detail_without_group_slugs() {
        let detail: MarketDetail = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert!(detail.group_slugs.is_none());

        let detail: MarketDetail =
            serde_json::from_str(r#"{"groupSlugs": ["fun", "personal"]}"#).unwrap();
        assert_eq!(detail.group_slugs.unwrap(), vec!["fun", "personal"]);
    }

    #[tokio::test]
    async fn test_oversized_page_rejected_before_request() {
        let scanner = ManifoldScanner::new(&Config::default()).unwrap();
        let err = scanner
            .fetch_page(FetchRequest::new(0, MAX_PAGE_LENGTH + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }
}
