//! Gemini API client
//!
//! Direct HTTP client for calling the Gemini API with per-agent generation
//! parameters. Agents always request JSON output; parsing the payload into
//! a typed fragment is the agent's job, not the client's.

use crate::config::ModelConfig;
use crate::gemini::types::{
    GeminiApiRequest, GeminiApiResponse, GenerationConfig, RequestContent,
};
use async_trait::async_trait;
use thiserror::Error;

const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Errors from the external generation service
#[derive(Error, Debug)]
pub enum GenerationError {
    /// API key missing at call time
    #[error("API key is empty")]
    MissingApiKey,

    /// The HTTP request itself failed (connect, TLS, ...)
    #[error("failed to send HTTP request: {0}")]
    Transport(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("rate limit exceeded (HTTP 429): {0}")]
    RateLimited(String),

    /// Non-success HTTP status
    #[error("API returned error status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error body, as far as it could be read
        body: String,
    },

    /// Response body was not the expected JSON shape
    #[error("failed to parse API response: {0}")]
    InvalidResponse(String),

    /// The prompt was blocked by the service
    #[error("prompt was blocked: {0}")]
    Blocked(String),

    /// Response carried no usable text
    #[error("response contained no text content")]
    EmptyResponse,
}

/// External text-generation service
///
/// Accepts a system role, per-agent generation parameters, and a prompt
/// payload; returns the raw structured-output text or an error. The agent
/// wrappers are the only callers.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Run one generation call
    async fn generate(
        &self,
        config: &ModelConfig,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, GenerationError>;
}

/// `GenerationService` backed by the Gemini REST API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client with a shared connection pool
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, GEMINI_API_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL (for testing)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(
        &self,
        config: &ModelConfig,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, config.model, self.api_key
        );

        let request_body = GeminiApiRequest {
            system_instruction: Some(RequestContent::text(system_prompt)),
            contents: vec![RequestContent::text(user_prompt)],
            generation_config: Some(GenerationConfig {
                temperature: Some(config.temperature),
                max_output_tokens: Some(config.max_output_tokens),
                response_mime_type: Some("application/json".to_string()),
            }),
        };

        tracing::debug!(
            model = %config.model,
            temperature = config.temperature,
            prompt_len = user_prompt.len(),
            "Calling Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                status_code = status_code,
                error_body = %error_body,
                "Gemini API returned error status"
            );

            if status_code == 429 {
                return Err(GenerationError::RateLimited(error_body));
            }
            return Err(GenerationError::Status {
                status: status_code,
                body: error_body,
            });
        }

        let response_body = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let parsed: GeminiApiResponse = serde_json::from_str(&response_body).map_err(|e| {
            GenerationError::InvalidResponse(format!("{e} - response body: {response_body}"))
        })?;

        if let Some(feedback) = &parsed.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                return Err(GenerationError::Blocked(reason.clone()));
            }
        }

        let candidate = parsed
            .candidates
            .first()
            .ok_or(GenerationError::EmptyResponse)?;
        let part = candidate
            .content
            .parts
            .first()
            .ok_or(GenerationError::EmptyResponse)?;

        if part.text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        tracing::debug!(
            response_len = part.text.len(),
            "Successfully received response from Gemini API"
        );

        Ok(part.text.clone())
    }
}
