//! Market selection pipeline
//!
//! Picks the markets to feed the bot: fetch every open binary market
//! closing inside a window around the last free day, rank them by bad tags,
//! bettor count and lateness, keep the best N and write them to a report.
//!
//! ```text
//! ListingSource → locate/collect (window) → rank (tags on demand) → report
//! ```

pub mod market;
pub mod ranking;
pub mod report;
pub mod window;

pub use market::{Market, Tags};
pub use ranking::{days_late, rank_markets, sort_key, SortKey};
pub use report::{market_comment, write_report, write_report_file, ReportHeader};
pub use window::{collect_markets, locate_start_offset, TimeWindow};

use crate::scanner::{ListingSource, MAX_PAGE_LENGTH};
use crate::services::ApiError;
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Tags to steer away from, most important to avoid last
pub const DEFAULT_BAD_TAGS: [&str; 8] = [
    "personal",
    "personal-goals",
    "fun",
    "selfresolving",
    "free-money",
    "nonpredictive-profits",
    "nonpredictive",
    "unsubsidized",
];

/// Errors from the selection pipeline
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(
        "Market {market_id} closes at {close_time}, before the window start {min_close_time}, \
         after in-window markets were already collected; the listing is no longer sorted by close time"
    )]
    OrderingViolation {
        market_id: String,
        close_time: DateTime<Utc>,
        min_close_time: DateTime<Utc>,
    },

    #[error("Failed to fetch tags for market {market_id}: {source}")]
    Tags {
        market_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to write report to {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Inclusive bettor-count band with zero penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BettorRange {
    pub low: u32,
    pub high: u32,
}

impl BettorRange {
    pub fn new(low: u32, high: u32) -> Result<Self, SelectionError> {
        if low > high {
            return Err(SelectionError::InvalidFilter(format!(
                "bettor range [{}, {}] is not increasing",
                low, high
            )));
        }
        Ok(Self { low, high })
    }
}

/// Run-scoped ranking parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterConfig {
    /// Markets closing after this day accrue a lateness penalty
    pub last_free_day: NaiveDate,
    pub bettor_range: BettorRange,
    /// Ordered so the tag most important to avoid comes last
    pub bad_tags: Vec<String>,
}

impl FilterConfig {
    pub fn new(last_free_day: NaiveDate, bettor_range: BettorRange, bad_tags: Vec<String>) -> Self {
        Self {
            last_free_day,
            bettor_range,
            bad_tags,
        }
    }

    /// Bad tags from most to least significant (reverse of configured order)
    pub fn bad_tags_by_priority(&self) -> impl Iterator<Item = &String> + '_ {
        self.bad_tags.iter().rev()
    }
}

/// Everything one selection run needs
#[derive(Debug, Clone)]
pub struct SelectionParams {
    pub filter: FilterConfig,
    pub max_markets: usize,
    pub days_before: u32,
    pub days_after: u32,
    pub page_size: usize,
}

impl SelectionParams {
    pub fn new(filter: FilterConfig, max_markets: usize) -> Self {
        Self {
            filter,
            max_markets,
            days_before: 1,
            days_after: 6,
            page_size: MAX_PAGE_LENGTH,
        }
    }

    pub fn window(&self) -> Result<TimeWindow, SelectionError> {
        TimeWindow::around(self.filter.last_free_day, self.days_before, self.days_after)
    }

    fn validate(&self) -> Result<(), SelectionError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_LENGTH {
            return Err(SelectionError::InvalidFilter(format!(
                "page size {} outside 1..={}",
                self.page_size, MAX_PAGE_LENGTH
            )));
        }
        Ok(())
    }
}

/// Result of a selection run
#[derive(Debug, Clone)]
pub struct Selection {
    pub window: TimeWindow,
    /// Distinct markets found in the window before ranking
    pub fetched: usize,
    /// Ranked markets, best first
    pub markets: Vec<Market>,
}

impl Selection {
    pub fn header(&self, selected_on: NaiveDate, filter: &FilterConfig) -> ReportHeader {
        ReportHeader {
            selected_on,
            window: self.window,
            last_free_day: filter.last_free_day,
        }
    }
}

/// Fetch, rank and truncate the markets for one run
pub async fn select_markets<S, R>(
    source: &S,
    params: &SelectionParams,
    rng: &mut R,
) -> Result<Selection, SelectionError>
where
    S: ListingSource + ?Sized,
    R: Rng + ?Sized,
{
    params.validate()?;
    let window = params.window()?;

    info!(
        "Fetching markets that close between {} and {}",
        window.min_close_time, window.max_close_time
    );
    let markets = collect_markets(source, &window, params.page_size).await?;
    let fetched = markets.len();
    info!("Fetched {} markets", fetched);

    let markets = rank_markets(source, markets, &params.filter, params.max_markets, rng).await?;
    info!(
        "Filtered to {} markets (of {} maximum)",
        markets.len(),
        params.max_markets
    );

    Ok(Selection {
        window,
        fetched,
        markets,
    })
}
