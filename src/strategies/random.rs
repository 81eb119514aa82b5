//! Baseline decision maker that picks uniformly at random

use super::DecisionMaker;
use crate::types::{Choice, Decision, MarketData};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Mutex;

pub struct RandomDecisionMaker {
    rng: Mutex<StdRng>,
}

impl RandomDecisionMaker {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible choices for a given seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomDecisionMaker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionMaker for RandomDecisionMaker {
    async fn make_decision(&self, _market: &MarketData, context: &str) -> Result<Decision> {
        let choice = {
            let mut rng = self.rng.lock().map_err(|_| anyhow!("RNG lock poisoned"))?;
            *Choice::ALL.choose(&mut *rng).unwrap_or(&Choice::DoNothing)
        };

        Ok(Decision {
            choice,
            reasoning: format!("Reasoning for: {}", serde_json::to_string(context)?),
            probability: None,
        })
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
