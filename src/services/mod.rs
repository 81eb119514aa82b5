//! External services used by the bot and the selection pipeline

pub mod api_errors;
pub mod llm;
pub mod retry;
pub mod search;

pub use api_errors::ApiError;
pub use llm::{extract_json, Llm, LlmModel, MockLlm, OpenAiLlm};
pub use retry::{with_retry, RetryConfig};
pub use search::{BingSearchHandler, MockSearchHandler, SearchHandler};
