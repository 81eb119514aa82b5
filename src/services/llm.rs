//! Language model clients
//!
//! The bot asks a model for search queries (JSON) and the forecasting
//! decision maker asks for free text. Both go through [`Llm`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "You are a careful forecaster for prediction markets.";
const JSON_SYSTEM_PROMPT: &str = "You are a careful forecaster for prediction markets. You always answer with valid JSON.";

/// Text and JSON sampling from a language model
#[async_trait]
pub trait Llm: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn sample_text(&self, prompt: &str) -> Result<String>;

    async fn sample_json(&self, prompt: &str) -> Result<Value>;
}

/// Strip a surrounding markdown code fence, if any
pub fn extract_json(content: &str) -> &str {
    content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Echoes the prompt back; used for offline runs and tests
#[derive(Debug, Default, Clone)]
pub struct MockLlm;

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn sample_text(&self, prompt: &str) -> Result<String> {
        Ok(format!("MOCK LLM<{}>MOCK LLM", prompt))
    }

    async fn sample_json(&self, prompt: &str) -> Result<Value> {
        Ok(json!({ "prompt": prompt }))
    }
}

/// Hosted chat models the bot knows how to call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmModel {
    Gpt4o,
    Gpt4oMini,
}

impl LlmModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmModel::Gpt4o => "gpt-4o",
            LlmModel::Gpt4oMini => "gpt-4o-mini",
        }
    }
}

impl fmt::Display for LlmModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OpenAI-compatible chat completions client
pub struct OpenAiLlm {
    client: Client,
    api_url: String,
    api_key: String,
    model: LlmModel,
}

impl OpenAiLlm {
    pub fn new(client: Client, api_url: impl Into<String>, api_key: impl Into<String>, model: LlmModel) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            model,
        }
    }

    fn request_body(&self, system: &str, prompt: &str, json_mode: bool) -> Value {
        let mut body = json!({
            "model": self.model.as_str(),
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
        });
        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }

    async fn complete(&self, body: Value) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_url);
        info!("Calling LLM at {} with model {}", url, self.model);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("LLM request failed")?;

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error ({}): {}", status, err_text);
        }

        let resp_json: Value = res.json().await.context("LLM response was not JSON")?;
        let content = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .context("No content in LLM response")?;

        debug!("LLM returned {} chars", content.len());
        Ok(content.to_string())
    }
}

#[async_trait]
impl Llm for OpenAiLlm {
    fn name(&self) -> &str {
        self.model.as_str()
    }

    async fn sample_text(&self, prompt: &str) -> Result<String> {
        self.complete(self.request_body(SYSTEM_PROMPT, prompt, false)).await
    }

    async fn sample_json(&self, prompt: &str) -> Result<Value> {
        let content = self
            .complete(self.request_body(JSON_SYSTEM_PROMPT, prompt, true))
            .await?;
        let clean = extract_json(&content);
        serde_json::from_str(clean).with_context(|| format!("Failed to parse LLM JSON: {}", clean))
    }
}
