//! Core types for the Manifold trading bot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A comment on a market, as shown to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub user: String,
    pub text: String,
    pub time: DateTime<Utc>,
}

/// Everything the bot knows about a market when deciding how to bet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub id: String,
    pub title: String,
    pub creator: String,
    pub description: String,
    /// Current market probability of YES, in [0, 1]
    pub probability: f64,
    pub current_date: DateTime<Utc>,
    pub close_date: Option<DateTime<Utc>>,
    pub comments: Vec<Comment>,
}

impl MarketData {
    /// Probability rendered the way the prompts show it, e.g. "70.00%"
    pub fn probability_display(&self) -> String {
        format!("{:.2}%", self.probability * 100.0)
    }
}

/// Outcome a bet is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Yes,
    No,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Yes => write!(f, "YES"),
            Outcome::No => write!(f, "NO"),
        }
    }
}

/// Directional decision for a market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Choice {
    BuyYes,
    BuyNo,
    DoNothing,
}

impl Choice {
    pub const ALL: [Choice; 3] = [Choice::BuyYes, Choice::BuyNo, Choice::DoNothing];

    /// The outcome to buy, or `None` for `DO_NOTHING`
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Choice::BuyYes => Some(Outcome::Yes),
            Choice::BuyNo => Some(Outcome::No),
            Choice::DoNothing => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::BuyYes => "BUY_YES",
            Choice::BuyNo => "BUY_NO",
            Choice::DoNothing => "DO_NOTHING",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Choice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Choice::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| anyhow::anyhow!("Invalid bet: {}", s))
    }
}

/// A decision maker's answer for one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub choice: Choice,
    pub reasoning: String,
    /// Model's probability estimate, when the decision came from one
    pub probability: Option<f64>,
}
