//! Input-file runner
//!
//! Reads market URLs (one per line, `#` comments allowed, the selection
//! report format works as-is), decides on each, appends
//! `<url>: <CHOICE> (reasoning: ...)` to the output file and optionally bets.
//! Markets already decided in an existing output file are skipped.

use super::Bot;
use crate::executor::{Bettor, ExecutionResult};
use crate::types::Choice;
use anyhow::{Context, Result};
use colored::Colorize;
use regex::Regex;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

static DECISION_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?): (?:BUY_YES|BUY_NO|DO_NOTHING) \(reasoning: ").expect("valid decision line regex")
});

static TRAILING_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s#").expect("valid comment regex"));

/// Counters for one pass over the input file
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub decided: usize,
    pub already_done: usize,
    pub bets_placed: usize,
    pub bets_skipped: usize,
}

/// Market URL on an input line, or `None` for blank and comment lines
pub fn parse_market_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let url = match TRAILING_COMMENT_RE.find(line) {
        Some(m) => &line[..m.start()],
        None => line,
    };
    Some(url.trim())
}

/// URLs that already have a decision line in `output`
fn decided_urls(output: &Path) -> Result<HashSet<String>> {
    if !output.exists() {
        return Ok(HashSet::new());
    }
    let text = fs::read_to_string(output)
        .with_context(|| format!("Failed to read existing output {}", output.display()))?;
    Ok(text
        .lines()
        .filter_map(|line| DECISION_LINE_RE.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect())
}

/// Reasoning squashed onto a single line
fn one_line(reasoning: &str) -> String {
    reasoning.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn colored_choice(choice: Choice) -> colored::ColoredString {
    match choice {
        Choice::BuyYes => choice.as_str().green(),
        Choice::BuyNo => choice.as_str().red(),
        Choice::DoNothing => choice.as_str().dimmed(),
    }
}

pub async fn process_markets_file(
    input: &Path,
    output: &Path,
    bot: &Bot,
    bettor: Option<&dyn Bettor>,
) -> Result<RunSummary> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input {}", input.display()))?;
    let done = decided_urls(output)?;
    if !done.is_empty() {
        info!("Resuming: {} markets already in {}", done.len(), output.display());
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output)
        .with_context(|| format!("Failed to open output {}", output.display()))?;
    let mut out = BufWriter::new(file);
    let mut summary = RunSummary::default();

    for url in text.lines().filter_map(parse_market_line) {
        if done.contains(url) {
            summary.already_done += 1;
            continue;
        }

        let (decision, market) = bot
            .get_decision_for_market(url)
            .await
            .with_context(|| format!("Failed to decide on {}", url))?;

        writeln!(
            out,
            "{}: {} (reasoning: {})",
            url,
            decision.choice,
            one_line(&decision.reasoning)
        )?;
        out.flush()?;
        summary.decided += 1;

        println!("{}: {}", url, colored_choice(decision.choice));

        if let Some(bettor) = bettor {
            match bettor
                .bet(&market.id, decision.choice)
                .await
                .with_context(|| format!("Failed to bet on {}", url))?
            {
                ExecutionResult::Placed { outcome, amount, dry_run, .. } => {
                    summary.bets_placed += 1;
                    info!(
                        "{} M{} on {} for {}",
                        if dry_run { "[DRY RUN] Bet" } else { "Bet" },
                        amount,
                        outcome,
                        url
                    );
                }
                ExecutionResult::Skipped { reason } => {
                    summary.bets_skipped += 1;
                    info!("No bet: {}", reason);
                }
            }
        }
    }

    if summary.decided == 0 && summary.already_done == 0 {
        warn!("No market URLs in {}", input.display());
    }
    Ok(summary)
}
