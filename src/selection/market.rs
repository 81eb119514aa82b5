//! Selection-side market record with lazily resolved tags

use crate::scanner::{ListedMarket, ListingSource};
use crate::services::ApiError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Category labels of a market, fetched at most once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Tags {
    #[default]
    Unresolved,
    Resolved(HashSet<String>),
}

/// A market in the selection window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    pub id: String,
    pub url: String,
    pub close_time: DateTime<Utc>,
    pub bettor_count: u32,
    tags: Tags,
}

impl Market {
    pub fn new(id: impl Into<String>, url: impl Into<String>, close_time: DateTime<Utc>, bettor_count: u32) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            close_time,
            bettor_count,
            tags: Tags::Unresolved,
        }
    }

    /// Attach already-known tags
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Tags::Resolved(tags.into_iter().map(Into::into).collect());
        self
    }

    /// True once tags have been fetched. Never triggers a fetch.
    pub fn has_tags(&self) -> bool {
        matches!(self.tags, Tags::Resolved(_))
    }

    /// Resolved tags, or `None` if they were never fetched
    pub fn tags(&self) -> Option<&HashSet<String>> {
        match &self.tags {
            Tags::Resolved(tags) => Some(tags),
            Tags::Unresolved => None,
        }
    }

    /// Whether the market carries `tag`; unresolved tags count as absent
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().is_some_and(|tags| tags.contains(tag))
    }

    /// Fetch tags from `source` unless they are already resolved
    pub async fn resolve_tags<S>(&mut self, source: &S) -> Result<&HashSet<String>, ApiError>
    where
        S: ListingSource + ?Sized,
    {
        if let Tags::Unresolved = self.tags {
            let fetched = source.fetch_tags(&self.id).await?;
            self.tags = Tags::Resolved(fetched);
        }
        self.tags().ok_or_else(|| {
            ApiError::InvalidRequest(format!("tags of market {} were not stored", self.id))
        })
    }
}

impl From<ListedMarket> for Market {
    fn from(listed: ListedMarket) -> Self {
        Market::new(listed.id, listed.url, listed.close_time, listed.unique_bettor_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::MockListingSource;
    use chrono::TimeZone;

    fn market() -> Market {
        Market::new(
            "m1",
            "https://manifold.markets/a/m1",
            Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
            12,
        )
    }

    #[test]
    fn test_new_market_is_unresolved() {
        let m = market();
        assert!(!m.has_tags());
        assert!(m.tags().is_none());
        assert!(!m.has_tag("fun"));
    }

    #[tokio::test]
    async fn test_resolve_fetches_once() {
        let mut source = MockListingSource::new();
        source
            .expect_fetch_tags()
            .withf(|id| id == "m1")
            .times(1)
            .returning(|_| Ok(HashSet::from(["fun".to_string()])));

        let mut m = market();
        assert_eq!(m.bettor_count, 12);
        assert!(!m.has_tags());

        m.resolve_tags(&source).await.unwrap();
        let tags = m.resolve_tags(&source).await.unwrap();
        assert!(tags.contains("fun"));
        assert!(m.has_tags());
        assert!(m.has_tag("fun"));
    }

    #[tokio::test]
    async fn test_resolve_returns_fetched_tags_and_keeps_preset_ones() {
        let mut source = MockListingSource::new();
        source
            .expect_fetch_tags()
            .times(1)
            .returning(|_| Ok(HashSet::new()));

        let mut fresh = market();
        assert!(fresh.resolve_tags(&source).await.unwrap().is_empty());
        assert!(fresh.has_tags());

        let mut preset = market().with_tags(["science"]);
        let tags = preset.resolve_tags(&source).await.unwrap();
        assert_eq!(tags, &HashSet::from(["science".to_string()]));
    }

    #[tokio::test]
    async fn test_resolve_error_leaves_unresolved() {
        let mut source = MockListingSource::new();
        source
            .expect_fetch_tags()
            .returning(|_| Err(ApiError::Network("down".to_string())));

        let mut m = market();
        assert!(m.resolve_tags(&source).await.is_err());
        assert!(!m.has_tags());
    }
}
