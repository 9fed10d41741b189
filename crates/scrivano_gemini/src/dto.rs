//! Wire format for the Gemini `generateContent` endpoint.
//!
//! Field names follow the REST API's camelCase convention; optional fields
//! are omitted from request bodies and tolerated when absent in responses.

use serde::{Deserialize, Serialize};

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns; a single user turn for one-shot generation
    pub contents: Vec<Content>,
    /// Sampling parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    /// Per-category content blocking thresholds
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// Pieces of the turn, typically a single text part
    #[serde(default)]
    pub parts: Vec<Part>,
    /// "user" or "model"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// One piece of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Text payload; absent for non-text parts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Sampling parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling cutoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Top-k sampling cutoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Output token ceiling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// One content-safety threshold.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetySetting {
    /// Harm category identifier, e.g. `HARM_CATEGORY_HARASSMENT`
    pub category: String,
    /// Blocking threshold, e.g. `BLOCK_MEDIUM_AND_ABOVE`
    pub threshold: String,
}

/// Success body of `generateContent`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Generated candidates; empty when the prompt itself was blocked
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// One generated candidate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content; absent when generation was suppressed
    #[serde(default)]
    pub content: Option<Content>,
    /// Why generation stopped, e.g. `STOP`, `SAFETY`, `MAX_TOKENS`
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// The error payload
    pub error: ErrorDetail,
}

/// The `error` object inside an [`ErrorBody`].
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    /// Numeric code mirroring the HTTP status
    #[serde(default)]
    pub code: Option<u16>,
    /// Human-readable description
    #[serde(default)]
    pub message: Option<String>,
    /// Canonical status string, e.g. `RESOURCE_EXHAUSTED`
    #[serde(default)]
    pub status: Option<String>,
}
