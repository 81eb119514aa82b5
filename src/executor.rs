//! Bet placement on Manifold (dry run or real)

use crate::config::{Config, ManifoldApi};
use crate::types::{Choice, Outcome};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Places bets for the runner
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Bettor: Send + Sync {
    async fn bet(&self, market_id: &str, choice: Choice) -> Result<ExecutionResult>;
}

/// Result of a bet attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Placed {
        outcome: Outcome,
        amount: u32,
        dry_run: bool,
        bet_id: Option<String>,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BetRequest<'a> {
    amount: u32,
    contract_id: &'a str,
    outcome: Outcome,
    dry_run: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BetResponse {
    #[serde(default)]
    bet_id: Option<String>,
}

/// Places bets through `POST /bet`
pub struct HttpBettor {
    client: Client,
    base_url: String,
    api_key: String,
    amount: u32,
    dry_run: bool,
}

impl HttpBettor {
    pub fn new(config: &Config, api_key: impl Into<String>, dry_run: bool) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            base_url: config.manifold_api_url.clone(),
            api_key: api_key.into(),
            amount: config.bet_amount,
            dry_run,
        })
    }
}

#[async_trait]
impl Bettor for HttpBettor {
    async fn bet(&self, market_id: &str, choice: Choice) -> Result<ExecutionResult> {
        let Some(outcome) = choice.outcome() else {
            return Ok(ExecutionResult::Skipped {
                reason: format!("{} on {}", choice, market_id),
            });
        };

        let tag = if self.dry_run { "[DRY RUN]" } else { "[LIVE]" };
        info!("{} Betting M{} on {} in {}", tag, self.amount, outcome, market_id);

        let body = BetRequest {
            amount: self.amount,
            contract_id: market_id,
            outcome,
            dry_run: self.dry_run,
        };

        let res = self
            .client
            .post(ManifoldApi::bet_url(&self.base_url))
            .header("Authorization", format!("Key {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("Failed to submit bet")?;

        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("Bet on {} failed ({}): {}", market_id, status, text);
        }

        let bet_id = serde_json::from_str::<BetResponse>(&text)
            .ok()
            .and_then(|r| r.bet_id);
        debug!("Bet response for {}: {}", market_id, text);

        Ok(ExecutionResult::Placed {
            outcome,
            amount: self.amount,
            dry_run: self.dry_run,
            bet_id,
        })
    }
}
