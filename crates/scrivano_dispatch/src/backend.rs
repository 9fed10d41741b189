//! The seam between the dispatch loop and a concrete generation API.

use async_trait::async_trait;
use derive_builder::Builder;
use derive_getters::Getters;
use scrivano_error::DispatchResult;
use serde::{Deserialize, Serialize};

/// One logical generation request: the prompt plus sampling parameters.
///
/// Unset parameters fall back to the backend's configured defaults.
///
/// # Examples
///
/// ```
/// use scrivano_dispatch::GenerationRequest;
///
/// let request = GenerationRequest::builder()
///     .prompt("Explain photosynthesis to a ten-year-old.")
///     .temperature(Some(0.4))
///     .build()
///     .unwrap();
///
/// assert_eq!(request.temperature(), &Some(0.4));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder, Getters)]
#[builder(setter(into))]
pub struct GenerationRequest {
    /// Prompt text sent to the model
    prompt: String,
    /// Sampling temperature
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Nucleus sampling cutoff
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    /// Top-k sampling cutoff
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    /// Output token ceiling
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Creates a new builder for `GenerationRequest`.
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }

    /// A request carrying only a prompt, with every parameter defaulted.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            top_p: None,
            top_k: None,
            max_output_tokens: None,
        }
    }
}

/// One classified network attempt against a generation endpoint.
///
/// Implementations perform exactly one upstream call per invocation and map
/// every failure to a [`DispatchError`](scrivano_error::DispatchError) whose
/// kind the dispatch loop can act on. The dispatcher owns scheduling,
/// timeouts, and retries; backends own the wire format.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Issue one generation call using `key` as the upstream credential.
    ///
    /// Returns the generated text payload on success.
    async fn call(&self, key: &str, request: &GenerationRequest) -> DispatchResult<String>;
}

#[async_trait]
impl<B: GenerationBackend + ?Sized> GenerationBackend for std::sync::Arc<B> {
    async fn call(&self, key: &str, request: &GenerationRequest) -> DispatchResult<String> {
        self.as_ref().call(key, request).await
    }
}
