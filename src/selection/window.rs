//! Close-time window location and market collection
//!
//! The listing endpoint is ordered by ascending close time but can only be
//! addressed by offset, so the window start is found with a coarse forward
//! probe and the collector walks full pages from there.

use super::market::Market;
use super::SelectionError;
use crate::scanner::{FetchRequest, ListingSource};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

/// Half-open close-time window `[min_close_time, max_close_time)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub min_close_time: DateTime<Utc>,
    pub max_close_time: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(min_close_time: DateTime<Utc>, max_close_time: DateTime<Utc>) -> Self {
        Self {
            min_close_time,
            max_close_time,
        }
    }

    /// Window from midnight `days_before` days ahead of `center` up to (not
    /// including) midnight after the day `days_after` days past it.
    ///
    /// For a center of 2025-01-01 with 1 day before and 6 after, this is
    /// 2024-12-31T00:00Z up to 2025-01-08T00:00Z, so markets closing at any
    /// point on January 7 are included.
    pub fn around(center: NaiveDate, days_before: u32, days_after: u32) -> Result<Self, SelectionError> {
        let start = center
            .checked_sub_days(Days::new(days_before.into()))
            .ok_or_else(|| SelectionError::InvalidFilter(format!("{} minus {} days is out of range", center, days_before)))?;
        let end = center
            .checked_add_days(Days::new(u64::from(days_after) + 1))
            .ok_or_else(|| SelectionError::InvalidFilter(format!("{} plus {} days is out of range", center, days_after)))?;

        Ok(Self::new(midnight_utc(start), midnight_utc(end)))
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.min_close_time && instant < self.max_close_time
    }

    /// Last calendar day with instants inside the window
    pub fn last_included_day(&self) -> NaiveDate {
        (self.max_close_time - chrono::Duration::milliseconds(1)).date_naive()
    }
}

/// Midnight UTC at the start of `day`
pub fn midnight_utc(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Find a safe starting offset for markets closing at or after `min_time`.
///
/// Probes single-entry pages at multiples of `page_size` until one closes at
/// or after `min_time`, then backs off one page. The result never overshoots
/// the first matching record. An empty probe means the listing ended.
pub async fn locate_start_offset<S>(
    source: &S,
    min_time: DateTime<Utc>,
    page_size: usize,
) -> Result<usize, SelectionError>
where
    S: ListingSource + ?Sized,
{
    let mut offset = 0;

    loop {
        let probe = source.fetch_page(FetchRequest::new(offset, 1)).await?;
        match probe.first() {
            Some(market) if market.close_time >= min_time => break,
            Some(market) => {
                debug!(
                    "Offset {} closes at {}, before {}; advancing",
                    offset, market.close_time, min_time
                );
            }
            None => {
                debug!("Listing ended at offset {} while locating window", offset);
                break;
            }
        }
        offset += page_size;
    }

    let start = offset.saturating_sub(page_size);
    info!("Window starting at {} located near offset {}", min_time, start);
    Ok(start)
}

/// Collect every market whose close time lies inside `window`.
///
/// Pages are fetched from the located start offset until a record closes
/// at or past the window end, or the listing runs out. Markets are
/// deduplicated by id with the last copy seen winning; the result is in no
/// particular order.
pub async fn collect_markets<S>(
    source: &S,
    window: &TimeWindow,
    page_size: usize,
) -> Result<Vec<Market>, SelectionError>
where
    S: ListingSource + ?Sized,
{
    let mut offset = locate_start_offset(source, window.min_close_time, page_size).await?;
    let mut collected: HashMap<String, Market> = HashMap::new();
    let mut records_kept = 0usize;

    'pages: loop {
        let page = source.fetch_page(FetchRequest::new(offset, page_size)).await?;
        let page_len = page.len();

        for listed in page {
            if listed.close_time >= window.max_close_time {
                debug!("Market {} closes at {}, past the window; stopping", listed.id, listed.close_time);
                break 'pages;
            }
            if listed.close_time < window.min_close_time {
                if records_kept > 0 {
                    return Err(SelectionError::OrderingViolation {
                        market_id: listed.id,
                        close_time: listed.close_time,
                        min_close_time: window.min_close_time,
                    });
                }
                continue;
            }
            records_kept += 1;
            collected.insert(listed.id.clone(), Market::from(listed));
        }

        if page_len < page_size {
            debug!("Short page ({} < {}) at offset {}; listing ended", page_len, page_size, offset);
            break;
        }
        offset += page_size;
    }

    info!(
        "Collected {} markets ({} records before dedup)",
        collected.len(),
        records_kept
    );
    Ok(collected.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ListedMarket;
    use crate::services::ApiError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory listing that slices a fixed record list by offset/limit
    struct VecListing {
        records: Vec<ListedMarket>,
        calls: AtomicUsize,
    }

    impl VecListing {
        fn new(records: Vec<ListedMarket>) -> Self {
            Self {
                records,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ListingSource for VecListing {
        async fn fetch_page(&self, request: FetchRequest) -> Result<Vec<ListedMarket>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let start = request.offset.min(self.records.len());
            let end = (request.offset + request.limit).min(self.records.len());
            Ok(self.records[start..end].to_vec())
        }

        async fn fetch_tags(&self, _market_id: &str) -> Result<HashSet<String>, ApiError> {
            Ok(HashSet::new())
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn listed(id: &str, hours: i64, bettors: u32) -> ListedMarket {
        ListedMarket {
            id: id.to_string(),
            url: format!("https://manifold.markets/u/{}", id),
            close_time: base() + chrono::Duration::hours(hours),
            unique_bettor_count: bettors,
        }
    }

    /// Records closing one per hour starting at `base()`
    fn hourly(n: usize) -> Vec<ListedMarket> {
        (0..n).map(|i| listed(&format!("m{}", i), i as i64, 10)).collect()
    }

    fn ids(markets: &[Market]) -> Vec<String> {
        let mut ids: Vec<String> = markets.iter().map(|m| m.id.clone()).collect();
        ids.sort_by_key(|id| id[1..].parse::<usize>().unwrap_or(usize::MAX));
        ids
    }

    #[test]
    fn test_window_around_center_day() {
        let center = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let window = TimeWindow::around(center, 1, 6).unwrap();
        assert_eq!(window.min_close_time, Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap());
        assert_eq!(window.max_close_time, Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap());
        assert_eq!(window.last_included_day(), NaiveDate::from_ymd_opt(2025, 1, 7).unwrap());
        assert!(window.contains(Utc.with_ymd_and_hms(2025, 1, 7, 23, 59, 59).unwrap()));
        assert!(!window.contains(window.max_close_time));
    }

    #[tokio::test]
    async fn test_collect_exact_window_for_various_page_sizes() {
        let records = hourly(50);
        // [10h, 37h) → m10..=m36
        let window = TimeWindow::new(base() + chrono::Duration::hours(10), base() + chrono::Duration::hours(37));
        let expected: Vec<String> = (10..37).map(|i| format!("m{}", i)).collect();

        for page_size in [5, 7, 10, 25, 50, 64, 1000] {
            let source = VecListing::new(records.clone());
            let markets = collect_markets(&source, &window, page_size).await.unwrap();
            assert_eq!(ids(&markets), expected, "page size {}", page_size);
        }
    }

    #[tokio::test]
    async fn test_collect_window_reaching_end_of_listing() {
        let records = hourly(12);
        let window = TimeWindow::new(base() + chrono::Duration::hours(8), base() + chrono::Duration::hours(100));

        let source = VecListing::new(records);
        let markets = collect_markets(&source, &window, 4).await.unwrap();
        assert_eq!(ids(&markets), vec!["m8", "m9", "m10", "m11"]);
    }

    #[tokio::test]
    async fn test_collect_empty_when_window_after_listing() {
        let source = VecListing::new(hourly(6));
        let window = TimeWindow::new(base() + chrono::Duration::hours(50), base() + chrono::Duration::hours(60));
        let markets = collect_markets(&source, &window, 4).await.unwrap();
        assert!(markets.is_empty());
    }

    #[tokio::test]
    async fn test_dedup_across_page_boundary_keeps_last_copy() {
        let records = vec![
            listed("a", 1, 3),
            listed("b", 2, 3),
            listed("dup", 3, 5),
            listed("c", 4, 3),
            listed("dup", 5, 9),
            listed("d", 6, 3),
        ];
        let window = TimeWindow::new(base(), base() + chrono::Duration::hours(10));
        let source = VecListing::new(records);

        let markets = collect_markets(&source, &window, 3).await.unwrap();
        assert_eq!(markets.len(), 5);

        let dup: Vec<&Market> = markets.iter().filter(|m| m.id == "dup").collect();
        assert_eq!(dup.len(), 1);
        assert_eq!(dup[0].bettor_count, 9);
        assert_eq!(dup[0].close_time, base() + chrono::Duration::hours(5));
    }

    #[tokio::test]
    async fn test_ordering_violation_is_fatal() {
        let records = vec![
            listed("a", 5, 1),
            listed("b", 6, 1),
            listed("late", 1, 1),
            listed("c", 7, 1),
        ];
        let window = TimeWindow::new(base() + chrono::Duration::hours(4), base() + chrono::Duration::hours(20));
        let source = VecListing::new(records);

        let err = collect_markets(&source, &window, 10).await.unwrap_err();
        match err {
            SelectionError::OrderingViolation { market_id, min_close_time, .. } => {
                assert_eq!(market_id, "late");
                assert_eq!(min_close_time, window.min_close_time);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_records_before_window_skipped_until_first_collected() {
        // Start offset undershoots, so early records are silently skipped.
        let records = hourly(20);
        let window = TimeWindow::new(base() + chrono::Duration::hours(13), base() + chrono::Duration::hours(15));
        let source = VecListing::new(records);

        let markets = collect_markets(&source, &window, 8).await.unwrap();
        assert_eq!(ids(&markets), vec!["m13", "m14"]);
    }

    #[tokio::test]
    async fn test_locator_soundness() {
        let n = 200;
        let records = hourly(n);
        for page_size in [1, 3, 7, 16, 50, 199, 500] {
            for b in [0, 1, 2, 15, 16, 17, 99, 150, 199] {
                let source = VecListing::new(records.clone());
                let min_time = records[b].close_time;
                let offset = locate_start_offset(&source, min_time, page_size).await.unwrap();
                assert!(offset <= b, "page {} b {} offset {}", page_size, b, offset);
                assert!(offset + 2 * page_size > b, "page {} b {} offset {}", page_size, b, offset);
            }
        }
    }

    #[tokio::test]
    async fn test_locator_past_end_of_listing() {
        let source = VecListing::new(hourly(10));
        let offset = locate_start_offset(&source, base() + chrono::Duration::hours(500), 4)
            .await
            .unwrap();
        // Probes 0, 4, 8 are all early; 12 is empty.
        assert_eq!(offset, 8);
    }

    #[tokio::test]
    async fn test_collector_stops_at_window_end() {
        let source = VecListing::new(hourly(100));
        let window = TimeWindow::new(base(), base() + chrono::Duration::hours(5));
        collect_markets(&source, &window, 10).await.unwrap();
        // One locator probe, one page
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
