//! Decision makers: turn a market and its prompt into a bet choice

pub mod forecast;
pub mod random;

pub use forecast::{extract_probability, ForecastDecisionMaker};
pub use random::RandomDecisionMaker;

use crate::types::{Decision, MarketData};
use anyhow::Result;
use async_trait::async_trait;

/// Trait for decision makers
#[async_trait]
pub trait DecisionMaker: Send + Sync {
    /// Decide on `market` given the full prompt built for it
    async fn make_decision(&self, market: &MarketData, context: &str) -> Result<Decision>;

    /// Get decision maker name for display
    fn name(&self) -> &'static str;
}
