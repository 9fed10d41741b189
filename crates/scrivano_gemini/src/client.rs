//! HTTP driver for the Gemini `generateContent` endpoint.

use crate::classify::{classify_failure, extract_text};
use crate::dto::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
    SafetySetting,
};
use async_trait::async_trait;
use reqwest::Client;
use scrivano_dispatch::{GenerationBackend, GenerationDefaults, GenerationRequest};
use scrivano_error::{DispatchError, DispatchErrorKind, DispatchResult};
use tracing::{debug, instrument};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Harm categories the safety threshold is applied to.
const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// One-shot Gemini text generation over REST.
///
/// Performs exactly one upstream call per [`GenerationBackend::call`]
/// invocation; scheduling, timeouts, and retries belong to the dispatcher.
/// The credential travels as the `key` query parameter and is never logged.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    http: Client,
    base_url: String,
    defaults: GenerationDefaults,
}

impl GeminiBackend {
    /// Build a backend against the public Gemini endpoint.
    pub fn new(defaults: GenerationDefaults) -> Self {
        Self {
            http: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            defaults,
        }
    }

    /// Build a backend against a non-standard endpoint, e.g. a local stub.
    pub fn with_base_url(defaults: GenerationDefaults, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            defaults,
        }
    }

    /// The configured generation defaults.
    pub fn defaults(&self) -> &GenerationDefaults {
        &self.defaults
    }

    /// Assemble the wire request, letting per-request parameters override
    /// the configured defaults.
    fn build_body(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let config = GenerationConfig {
            temperature: Some((*request.temperature()).unwrap_or(self.defaults.temperature)),
            top_p: Some((*request.top_p()).unwrap_or(self.defaults.top_p)),
            top_k: Some((*request.top_k()).unwrap_or(self.defaults.top_k)),
            max_output_tokens: Some(
                (*request.max_output_tokens()).unwrap_or(self.defaults.max_output_tokens),
            ),
        };

        let safety_settings = HARM_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: (*category).to_string(),
                threshold: self.defaults.safety_threshold.clone(),
            })
            .collect();

        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(request.prompt().clone()),
                }],
                role: Some("user".to_string()),
            }],
            generation_config: Some(config),
            safety_settings,
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    #[instrument(skip_all, fields(model = %self.defaults.model))]
    async fn call(&self, key: &str, request: &GenerationRequest) -> DispatchResult<String> {
        let body = self.build_body(request);
        // The URL carries the credential; log the model only.
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.defaults.model, key
        );

        debug!("sending generateContent request");
        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            DispatchError::new(DispatchErrorKind::TransientService {
                status: 0,
                message: format!("request failed to reach the API: {e}"),
            })
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(DispatchError::new(classify_failure(
                status.as_u16(),
                &body_text,
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            DispatchError::new(DispatchErrorKind::MalformedResponse {
                message: format!("response body was not valid generateContent JSON: {e}"),
            })
        })?;

        extract_text(&parsed).map_err(DispatchError::new)
    }
}
