//! Prompt text for search-query generation and the final decision

use crate::types::{Comment, MarketData};
use chrono::{DateTime, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Search results keyed by query, in query order
pub type SearchResults = Vec<(String, Vec<String>)>;

fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `\n<name>:\n- a\n- b\n`, or empty when there is nothing to list.
/// `indent` adds two spaces per level before each bullet.
pub fn format_string_list(name: &str, items: &[String], indent: usize) -> String {
    if items.is_empty() {
        return String::new();
    }
    let indent_str = "  ".repeat(indent);
    let bullets: Vec<String> = items
        .iter()
        .map(|item| format!("{}- {}", indent_str, item))
        .collect();
    format!("\n{}:\n{}\n", name, bullets.join("\n"))
}

fn comment_lines(comments: &[Comment]) -> Vec<String> {
    comments
        .iter()
        .map(|c| format!("{} ({}): {}", c.user, format_date(&c.time), c.text))
        .collect()
}

pub fn format_search_results(results: &SearchResults) -> String {
    let per_query: Vec<String> = results
        .iter()
        .map(|(query, snippets)| format_string_list(query, snippets, 1).trim().to_string())
        .filter(|block| !block.is_empty())
        .collect();
    format_string_list("Search results", &per_query, 0)
}

/// Market block shared by both prompts
pub fn market_string(market: &MarketData) -> String {
    let close_date = market
        .close_date
        .as_ref()
        .map(format_date)
        .unwrap_or_else(|| "unknown".to_string());

    let mut result = format!(
        "\nTitle: {}\nCreator: {}\nDescription: {}\n\nCurrent probability: {}\nCurrent date: {}\nClose date: {}\n",
        market.title,
        market.creator,
        market.description,
        market.probability_display(),
        format_date(&market.current_date),
        close_date
    );

    let comments = format_string_list("Comments", &comment_lines(&market.comments), 0);
    if !comments.is_empty() {
        result.push('\n');
        result.push_str(&comments);
    }
    result
}

pub fn search_query_prompt(market: &MarketData) -> String {
    format!(
        r#"
Based on the following prediction market information, what search engine queries would you make to gather more relevant information for making a decision on how to bet?

{}

Please suggest up to 3 search queries that would help in analyzing this market.
Respond in JSON format like this:
    {{"search_queries": ["query1", "query2", "query3"]}}
"#,
        market_string(market)
    )
}

/// Queries used when no model is available to suggest them
pub fn fallback_search_queries(title: &str) -> Vec<String> {
    vec![
        format!("Recent developments in {}", title),
        format!("Expert opinions on {}", title),
        format!("Challenges in {}", title),
    ]
}

pub fn final_decision_prompt(market: &MarketData, search_results: &SearchResults) -> String {
    format!(
        r#"
Based on the following prediction market information and search results (if any), how likely is this market to resolve YES?

{}
{}

Weigh the evidence and explain your reasoning briefly. The bot will choose from BUY_YES, BUY_NO, or DO_NOTHING by comparing your estimate with the current probability.

End your answer with a single line in exactly this form:
Probability: NN%
"#,
        market_string(market),
        format_search_results(search_results)
    )
}
