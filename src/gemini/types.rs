//! Gemini API wire types
//!
//! Structs that mirror the Gemini API JSON request/response format.

use serde::{Deserialize, Serialize};

/// Top-level Gemini API response
#[derive(Deserialize, Debug)]
pub struct GeminiApiResponse {
    /// List of candidate responses from the model
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Optional feedback about the prompt (e.g., if it was blocked)
    #[serde(default, alias = "promptFeedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// A single candidate response from the model
#[derive(Deserialize, Debug)]
pub struct Candidate {
    /// The content of this candidate
    pub content: Content,
    /// Why the model stopped generating (if applicable)
    #[serde(default, alias = "finishReason")]
    #[allow(dead_code)] // Part of API response format
    pub finish_reason: Option<String>,
}

/// Content structure containing parts of the response
#[derive(Deserialize, Debug)]
pub struct Content {
    /// List of content parts (typically one text part)
    pub parts: Vec<Part>,
    /// Role of the content (e.g., "model")
    #[serde(default)]
    #[allow(dead_code)] // Part of API response format
    pub role: String,
}

/// A single part of content (typically text)
#[derive(Deserialize, Debug)]
pub struct Part {
    /// The text content of this part
    pub text: String,
}

/// Feedback about the prompt (e.g., if it was blocked)
#[derive(Deserialize, Debug)]
pub struct PromptFeedback {
    /// Reason the prompt was blocked (if applicable)
    #[serde(default, alias = "blockReason")]
    pub block_reason: Option<String>,
}

/// Request structure for the Gemini API
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeminiApiRequest {
    /// System role for this call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<RequestContent>,
    /// List of content items to send
    pub contents: Vec<RequestContent>,
    /// Generation configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Content structure for requests
#[derive(Serialize, Debug)]
pub struct RequestContent {
    /// List of content parts
    pub parts: Vec<RequestPart>,
}

impl RequestContent {
    /// Build a single-part text content
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![RequestPart { text: text.into() }],
        }
    }
}

/// A single part for requests (typically text)
#[derive(Serialize, Debug)]
pub struct RequestPart {
    /// The text content
    pub text: String,
}

/// Generation configuration for requests
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Output size ceiling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// MIME type to force for the response (e.g., "application/json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GeminiApiRequest {
            system_instruction: Some(RequestContent::text("system role")),
            contents: vec![RequestContent::text("user prompt")],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.3),
                max_output_tokens: Some(2048),
                response_mime_type: Some("application/json".to_string()),
            }),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"systemInstruction\""));
        assert!(json.contains("\"generationConfig\""));
        assert!(json.contains("\"maxOutputTokens\":2048"));
        assert!(json.contains("\"responseMimeType\":\"application/json\""));
    }

    #[test]
    fn test_response_tolerates_missing_candidates() {
        let parsed: GeminiApiResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(parsed.candidates.is_empty());
        assert!(parsed.prompt_feedback.is_none());
    }
}
