//! Manifold API Error Classification
//!
//! Turns reqwest failures and non-2xx responses into structured errors
//! so the retry wrapper can decide what is worth another attempt.

use serde::Deserialize;
use thiserror::Error;

/// Structured API error types
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network/connection error (timeout, DNS, reset, etc.)
    #[error("Network error: {0}")]
    Network(String),
    /// Rate limited by the API (HTTP 429)
    #[error("Rate limited by {url}")]
    RateLimited { url: String },
    /// Any other non-success HTTP status
    #[error("HTTP {status} from {url}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },
    /// Response body was not the JSON we expected
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
    /// Request was rejected before it was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Manifold error response format
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiError {
    /// Build an error from a non-success status and its body
    pub fn from_response(status: u16, url: &str, body: &str) -> Self {
        if status == 429 {
            return ApiError::RateLimited {
                url: url.to_string(),
            };
        }

        let message = match serde_json::from_str::<ErrorResponse>(body) {
            Ok(parsed) => parsed
                .message
                .or(parsed.error)
                .unwrap_or_else(|| body.to_string()),
            Err(_) => body.to_string(),
        };

        ApiError::Status {
            status,
            url: url.to_string(),
            message,
        }
    }

    /// Classify a reqwest error raised before a response arrived
    pub fn from_network_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Connection failed".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }

    /// Whether another attempt could succeed.
    ///
    /// Every request-level failure counts, including 4xx statuses and
    /// truncated or garbled bodies. Requests rejected before sending never
    /// succeed on a second try.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_)
                | ApiError::RateLimited { .. }
                | ApiError::Status { .. }
                | ApiError::Decode { .. }
        )
    }
}
