//! LLM forecasting decision maker
//!
//! The model is asked for its reasoning followed by a `Probability: NN%`
//! line. The estimate is compared with the market price and a bet is only
//! taken when the gap exceeds `min_edge`.

use super::DecisionMaker;
use crate::services::Llm;
use crate::types::{Choice, Decision, MarketData};
use anyhow::{bail, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

pub const DEFAULT_MIN_EDGE: f64 = 0.05;

static PROBABILITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)probability\**\s*[:=]\s*\**\s*(\d+(?:\.\d+)?)\s*(%)?").expect("valid probability regex")
});

/// Last `Probability: ...` value in `text`, as a fraction in [0, 1].
///
/// `NN%` is read as a percentage. A bare number up to 1 is read as a
/// fraction, anything larger as a percentage.
pub fn extract_probability(text: &str) -> Option<f64> {
    let caps = PROBABILITY_RE.captures_iter(text).last()?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let fraction = if caps.get(2).is_some() || value > 1.0 {
        value / 100.0
    } else {
        value
    };
    (0.0..=1.0).contains(&fraction).then_some(fraction)
}

pub struct ForecastDecisionMaker {
    llm: Arc<dyn Llm>,
    min_edge: f64,
}

impl ForecastDecisionMaker {
    pub fn new(llm: Arc<dyn Llm>, min_edge: f64) -> Self {
        Self { llm, min_edge }
    }

    /// Map an estimate against the market price to a choice
    pub fn choose(&self, estimate: f64, market_probability: f64) -> Choice {
        if estimate - market_probability > self.min_edge {
            Choice::BuyYes
        } else if market_probability - estimate > self.min_edge {
            Choice::BuyNo
        } else {
            Choice::DoNothing
        }
    }
}

#[async_trait]
impl DecisionMaker for ForecastDecisionMaker {
    async fn make_decision(&self, market: &MarketData, context: &str) -> Result<Decision> {
        debug!("Asking {} about market {}", self.llm.name(), market.id);
        let answer = self.llm.sample_text(context).await?;

        let Some(estimate) = extract_probability(&answer) else {
            bail!("No probability in {} answer for market {} ({})", self.llm.name(), market.id, market.title);
        };

        let choice = self.choose(estimate, market.probability);
        info!(
            "Market {}: estimate {:.1}% vs market {}, {}",
            market.id,
            estimate * 100.0,
            market.probability_display(),
            choice
        );

        Ok(Decision {
            choice,
            reasoning: answer,
            probability: Some(estimate),
        })
    }

    fn name(&self) -> &'static str {
        "forecast"
    }
}
