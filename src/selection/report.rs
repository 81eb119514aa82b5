//! Selected-markets report
//!
//! Format, consumed by the bot's input-file reader:
//!
//! ```text
//! # 2 markets selected on 2024-12-20.
//! # Close dates from 2024-12-31 to 2025-01-01 (or possibly up to 2025-01-07).
//! https://manifold.markets/u/a		# Closes 2025-01-01 12:00:00. 15 bettors.
//! https://manifold.markets/u/b		# Closes 2025-01-03 08:30:00. 4 bettors. Tags: ['fun']
//! ```

use super::market::Market;
use super::window::TimeWindow;
use super::{FilterConfig, SelectionError};
use chrono::{DateTime, NaiveDate, Utc};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Context printed in the two header lines
#[derive(Debug, Clone, Copy)]
pub struct ReportHeader {
    pub selected_on: NaiveDate,
    pub window: TimeWindow,
    pub last_free_day: NaiveDate,
}

/// Tag list rendered as `['a', 'b']`
fn format_tag_list(tags: &[&str]) -> String {
    let quoted: Vec<String> = tags.iter().map(|t| format!("'{}'", t)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Close time to the second, with microseconds only when there are any
fn format_close_time(close_time: &DateTime<Utc>) -> String {
    if close_time.timestamp_subsec_micros() == 0 {
        close_time.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        close_time.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// Comment written after the URL. Mentions bad tags only if the market's
/// tags were resolved while ranking.
pub fn market_comment(market: &Market, filter: &FilterConfig) -> String {
    let mut tags_str = String::new();
    if market.has_tags() {
        let present: Vec<&str> = filter
            .bad_tags_by_priority()
            .filter(|tag| market.has_tag(tag))
            .map(String::as_str)
            .collect();
        if !present.is_empty() {
            tags_str = format!(" Tags: {}", format_tag_list(&present));
        }
    }
    format!(
        "Closes {}. {} bettors.{}",
        format_close_time(&market.close_time),
        market.bettor_count,
        tags_str
    )
}

/// Write header and one `<url>\t\t# <comment>` line per market
pub fn write_report<W: Write>(
    mut out: W,
    markets: &[Market],
    header: &ReportHeader,
    filter: &FilterConfig,
) -> io::Result<()> {
    writeln!(
        out,
        "# {} markets selected on {}.",
        markets.len(),
        header.selected_on.format("%Y-%m-%d")
    )?;
    writeln!(
        out,
        "# Close dates from {} to {} (or possibly up to {}).",
        header.window.min_close_time.format("%Y-%m-%d"),
        header.last_free_day.format("%Y-%m-%d"),
        header.window.last_included_day().format("%Y-%m-%d")
    )?;
    for market in markets {
        writeln!(out, "{}\t\t# {}", market.url, market_comment(market, filter))?;
    }
    out.flush()
}

/// Create (or truncate) `path` and write the report into it
pub fn write_report_file(
    path: &Path,
    markets: &[Market],
    header: &ReportHeader,
    filter: &FilterConfig,
) -> Result<(), SelectionError> {
    let to_report_error = |source| SelectionError::Report {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_report_error)?;
    write_report(BufWriter::new(file), markets, header, filter).map_err(to_report_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::BettorRange;
    use chrono::{TimeZone, Utc};

    fn filter(bad_tags: &[&str]) -> FilterConfig {
        FilterConfig::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            BettorRange::new(10, 20).unwrap(),
            bad_tags.iter().map(|t| t.to_string()).collect(),
        )
    }

    fn header() -> ReportHeader {
        let last_free_day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        ReportHeader {
            selected_on: NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            window: TimeWindow::around(last_free_day, 1, 6).unwrap(),
            last_free_day,
        }
    }

    fn market(id: &str, bettors: u32) -> Market {
        Market::new(
            id,
            format!("https://manifold.markets/u/{}", id),
            Utc.with_ymd_and_hms(2025, 1, 3, 8, 30, 0).unwrap(),
            bettors,
        )
    }

    #[test]
    fn test_comment_without_resolved_tags() {
        let f = filter(&["fun"]);
        assert_eq!(
            market_comment(&market("a", 4), &f),
            "Closes 2025-01-03 08:30:00. 4 bettors."
        );
    }

    #[test]
    fn test_comment_lists_present_bad_tags_in_priority_order() {
        let f = filter(&["personal", "fun", "unsubsidized"]);
        let m = market("a", 12).with_tags(["personal", "unsubsidized", "science"]);
        assert_eq!(
            market_comment(&m, &f),
            "Closes 2025-01-03 08:30:00. 12 bettors. Tags: ['unsubsidized', 'personal']"
        );
    }

    #[test]
    fn test_comment_resolved_but_clean() {
        let f = filter(&["fun"]);
        let m = market("a", 12).with_tags(["science"]);
        assert_eq!(market_comment(&m, &f), "Closes 2025-01-03 08:30:00. 12 bettors.");
    }

    #[test]
    fn test_comment_keeps_sub_second_close_time() {
        let close = Utc.with_ymd_and_hms(2025, 1, 3, 8, 30, 0).unwrap() + chrono::Duration::milliseconds(123);
        let m = Market::new("a", "https://manifold.markets/u/a", close, 12);
        assert_eq!(
            market_comment(&m, &filter(&[])),
            "Closes 2025-01-03 08:30:00.123000. 12 bettors."
        );
    }

    #[test]
    fn test_write_report_layout() {
        let f = filter(&["fun"]);
        let markets = vec![market("a", 15), market("b", 3).with_tags(["fun"])];
        let mut buf = Vec::new();
        write_report(&mut buf, &markets, &header(), &f).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "# 2 markets selected on 2024-12-20.");
        assert_eq!(
            lines[1],
            "# Close dates from 2024-12-31 to 2025-01-01 (or possibly up to 2025-01-07)."
        );
        assert_eq!(
            lines[2],
            "https://manifold.markets/u/a\t\t# Closes 2025-01-03 08:30:00. 15 bettors."
        );
        assert_eq!(
            lines[3],
            "https://manifold.markets/u/b\t\t# Closes 2025-01-03 08:30:00. 3 bettors. Tags: ['fun']"
        );
    }

    #[test]
    fn test_write_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markets.txt");
        write_report_file(&path, &[market("a", 15)], &header(), &filter(&[])).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# 1 markets selected on 2024-12-20.\n"));
        assert!(text.ends_with("https://manifold.markets/u/a\t\t# Closes 2025-01-03 08:30:00. 15 bettors.\n"));
    }

    #[test]
    fn test_write_report_file_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("markets.txt");
        let err = write_report_file(&path, &[], &header(), &filter(&[])).unwrap_err();
        assert!(matches!(err, SelectionError::Report { .. }));
    }
}
