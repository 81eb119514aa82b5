//! Market ranking by lexicographic penalty keys
//!
//! Key layout, most significant first:
//! one 0/1 component per bad tag (last configured tag first), bettors below
//! the range, bettors above the range, whole days closing after the last
//! free day.

use super::market::Market;
use super::window::midnight_utc;
use super::{FilterConfig, SelectionError};
use crate::scanner::ListingSource;
use chrono::{DateTime, NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

/// Penalty tuple; compared lexicographically, lower is better
pub type SortKey = Vec<u64>;

/// Whole days `close_time` falls after midnight UTC of `last_free_day`, floored at zero
pub fn days_late(close_time: DateTime<Utc>, last_free_day: NaiveDate) -> u64 {
    let days = (close_time - midnight_utc(last_free_day)).num_days();
    u64::try_from(days).unwrap_or(0)
}

/// Compute the sort key of a market.
///
/// Tags that were never resolved count as absent, so callers that care
/// about tag penalties resolve them first (see [`rank_markets`]).
pub fn sort_key(market: &Market, filter: &FilterConfig) -> SortKey {
    let mut key: SortKey = filter
        .bad_tags_by_priority()
        .map(|tag| u64::from(market.has_tag(tag)))
        .collect();

    let bettors = u64::from(market.bettor_count);
    key.push(u64::from(filter.bettor_range.low).saturating_sub(bettors));
    key.push(bettors.saturating_sub(u64::from(filter.bettor_range.high)));
    key.push(days_late(market.close_time, filter.last_free_day));
    key
}

/// Shuffle, sort by penalty key and keep the best `max_markets`.
///
/// The shuffle spreads arbitrary tie-breaks evenly; the sort is stable so a
/// fixed RNG seed gives a fixed order. Tags are fetched only when
/// `bad_tags` is non-empty, and then at most once per market.
pub async fn rank_markets<S, R>(
    source: &S,
    mut markets: Vec<Market>,
    filter: &FilterConfig,
    max_markets: usize,
    rng: &mut R,
) -> Result<Vec<Market>, SelectionError>
where
    S: ListingSource + ?Sized,
    R: Rng + ?Sized,
{
    markets.shuffle(rng);

    if !filter.bad_tags.is_empty() {
        let total = markets.len();
        info!("Fetching tags for {} markets", total);
        for (i, market) in markets.iter_mut().enumerate() {
            let market_id = market.id.clone();
            market
                .resolve_tags(source)
                .await
                .map_err(|err| SelectionError::Tags {
                    market_id,
                    source: err,
                })?;
            if (i + 1) % 100 == 0 {
                info!("Fetched tags for {}/{} markets", i + 1, total);
            }
        }
    }

    let mut keyed: Vec<(SortKey, Market)> = markets
        .into_iter()
        .map(|m| (sort_key(&m, filter), m))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some((best, _)) = keyed.first() {
        debug!("Best sort key: {:?}", best);
    }

    Ok(keyed
        .into_iter()
        .take(max_markets)
        .map(|(_, m)| m)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::MockListingSource;
    use crate::selection::BettorRange;
    use crate::services::ApiError;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn filter(bad_tags: &[&str]) -> FilterConfig {
        FilterConfig::new(
            day(2025, 1, 1),
            BettorRange::new(10, 20).unwrap(),
            bad_tags.iter().map(|t| t.to_string()).collect(),
        )
    }

    fn market(id: &str, bettors: u32, close: DateTime<Utc>) -> Market {
        Market::new(id, format!("https://manifold.markets/u/{}", id), close, bettors)
    }

    fn no_fetch_source() -> MockListingSource {
        let mut source = MockListingSource::new();
        source.expect_fetch_tags().never();
        source
    }

    #[test]
    fn test_days_late() {
        let last_free = day(2025, 1, 1);
        assert_eq!(days_late(Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap(), last_free), 2);
        assert_eq!(days_late(Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(), last_free), 0);
        assert_eq!(days_late(Utc.with_ymd_and_hms(2025, 1, 2, 23, 59, 59).unwrap(), last_free), 1);
        assert_eq!(days_late(Utc.with_ymd_and_hms(2025, 1, 1, 18, 0, 0).unwrap(), last_free), 0);
    }

    #[test]
    fn test_sort_key_bettor_penalties() {
        let f = filter(&[]);
        let close = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(sort_key(&market("low", 4, close), &f), vec![6, 0, 0]);
        assert_eq!(sort_key(&market("mid", 15, close), &f), vec![0, 0, 0]);
        assert_eq!(sort_key(&market("edge", 20, close), &f), vec![0, 0, 0]);
        assert_eq!(sort_key(&market("high", 33, close), &f), vec![0, 13, 0]);
    }

    #[test]
    fn test_sort_key_reverses_bad_tag_priority() {
        let f = filter(&["a", "b"]);
        let close = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let only_a = market("a", 15, close).with_tags(["a"]);
        let only_b = market("b", 15, close).with_tags(["b"]);

        assert_eq!(sort_key(&only_a, &f), vec![0, 1, 0, 0, 0]);
        assert_eq!(sort_key(&only_b, &f), vec![1, 0, 0, 0, 0]);
        assert!(sort_key(&only_b, &f) > sort_key(&only_a, &f));
    }

    #[tokio::test]
    async fn test_rank_end_to_end_order() {
        let f = filter(&["x"]);
        let a = market("A", 15, Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap());
        let b = market("B", 5, Utc.with_ymd_and_hms(2025, 1, 4, 12, 0, 0).unwrap());
        let c = market("C", 15, Utc.with_ymd_and_hms(2025, 1, 2, 12, 0, 0).unwrap());

        let mut source = MockListingSource::new();
        source.expect_fetch_tags().times(3).returning(|id| {
            if id == "B" {
                Ok(HashSet::from(["x".to_string()]))
            } else {
                Ok(HashSet::new())
            }
        });

        let mut rng = StdRng::seed_from_u64(7);
        let ranked = rank_markets(&source, vec![b, c, a], &f, 10, &mut rng).await.unwrap();
        let order: Vec<&str> = ranked.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(order, vec!["A", "C", "B"]);
        assert!(ranked.iter().all(Market::has_tags));
    }

    #[tokio::test]
    async fn test_rank_without_bad_tags_never_fetches() {
        let f = filter(&[]);
        let close = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let markets = vec![market("m1", 15, close), market("m2", 1, close)];

        let mut rng = StdRng::seed_from_u64(1);
        let ranked = rank_markets(&no_fetch_source(), markets, &f, 10, &mut rng).await.unwrap();
        assert_eq!(ranked[0].id, "m1");
        assert!(ranked.iter().all(|m| !m.has_tags()));
    }

    #[tokio::test]
    async fn test_rank_truncates_to_max_markets() {
        let f = filter(&[]);
        let close = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let markets: Vec<Market> = (0..10).map(|i| market(&format!("m{}", i), i, close)).collect();

        let mut rng = StdRng::seed_from_u64(3);
        let ranked = rank_markets(&no_fetch_source(), markets, &f, 3, &mut rng).await.unwrap();
        assert_eq!(ranked.len(), 3);
        // Fewer bettors below the range is a bigger penalty, so the top three are m9, m8, m7.
        let order: Vec<&str> = ranked.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(order, vec!["m9", "m8", "m7"]);
    }

    #[tokio::test]
    async fn test_rank_deterministic_for_fixed_seed() {
        let f = filter(&[]);
        let close = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        // All tied, so the order is decided by the shuffle alone.
        let markets: Vec<Market> = (0..30).map(|i| market(&format!("m{}", i), 15, close)).collect();

        let mut first_rng = StdRng::seed_from_u64(42);
        let first = rank_markets(&no_fetch_source(), markets.clone(), &f, 12, &mut first_rng)
            .await
            .unwrap();
        let mut second_rng = StdRng::seed_from_u64(42);
        let second = rank_markets(&no_fetch_source(), markets, &f, 12, &mut second_rng)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 12);
    }

    #[tokio::test]
    async fn test_tag_failure_names_market() {
        let f = filter(&["fun"]);
        let close = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let mut source = MockListingSource::new();
        source
            .expect_fetch_tags()
            .times(1)
            .returning(|_| Err(ApiError::Network("down".to_string())));

        let mut rng = StdRng::seed_from_u64(1);
        let err = rank_markets(&source, vec![market("broken", 15, close)], &f, 10, &mut rng)
            .await
            .unwrap_err();
        match err {
            SelectionError::Tags { market_id, .. } => assert_eq!(market_id, "broken"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
