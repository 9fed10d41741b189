//! High-level text generation facade over the dispatch core.

use crate::GeminiBackend;
use scrivano_dispatch::{
    DispatchStatus, Dispatcher, GenerationRequest, ScrivanoConfig,
};
use scrivano_error::{ConfigError, ScrivanoError, ScrivanoResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Environment variable holding a comma-separated credential list.
const KEYS_VAR: &str = "GEMINI_API_KEYS";
/// Fallback variable holding a single credential.
const KEY_VAR: &str = "GEMINI_API_KEY";

/// Rate-limited, retrying Gemini text generation.
///
/// Wraps a [`Dispatcher`] over a [`GeminiBackend`], so every generation
/// call gets credential rotation, sliding-window rate limiting, and
/// classified retry for free.
///
/// # Example
///
/// ```no_run
/// use scrivano_gemini::TextGenerator;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let generator = TextGenerator::from_env()?;
/// let lesson = generator
///     .generate("Write three quiz questions about photosynthesis.")
///     .await?;
/// println!("{lesson}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TextGenerator {
    dispatcher: Dispatcher<GeminiBackend>,
}

impl TextGenerator {
    /// Build a generator for `keys` with configuration loaded from the
    /// standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error when configuration fails to load or `keys` is
    /// empty.
    #[instrument(skip_all)]
    pub fn new(keys: Vec<String>) -> ScrivanoResult<Self> {
        let config = ScrivanoConfig::load()?;
        Self::with_config(keys, &config)
    }

    /// Build a generator for `keys` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when `keys` is empty or contains a blank entry.
    #[instrument(skip_all)]
    pub fn with_config(keys: Vec<String>, config: &ScrivanoConfig) -> ScrivanoResult<Self> {
        let backend = GeminiBackend::new(config.generation.clone());
        let dispatcher = Dispatcher::from_config(backend, keys, config)?;
        Ok(Self { dispatcher })
    }

    /// Build a generator from the environment.
    ///
    /// Reads `GEMINI_API_KEYS` as a comma-separated list, falling back to
    /// the single-credential `GEMINI_API_KEY`. A `.env` file in the current
    /// directory is honored when present.
    ///
    /// # Errors
    ///
    /// Returns an error when neither variable yields a credential.
    #[instrument]
    pub fn from_env() -> ScrivanoResult<Self> {
        // A missing .env file is fine; process variables still apply.
        dotenvy::dotenv().ok();

        let keys = Self::keys_from_env()?;
        debug!(credentials = keys.len(), "loaded credentials from environment");
        Self::new(keys)
    }

    fn keys_from_env() -> ScrivanoResult<Vec<String>> {
        if let Ok(raw) = std::env::var(KEYS_VAR) {
            let keys: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
            if !keys.is_empty() {
                return Ok(keys);
            }
        }
        if let Ok(key) = std::env::var(KEY_VAR) {
            if !key.trim().is_empty() {
                return Ok(vec![key.trim().to_string()]);
            }
        }
        Err(ScrivanoError::from(ConfigError::new(format!(
            "no Gemini credentials found: set {KEYS_VAR} (comma-separated) or {KEY_VAR}"
        ))))
    }

    /// Generate text for a bare prompt with default parameters.
    ///
    /// # Errors
    ///
    /// Propagates the classified dispatch failure once retries are
    /// exhausted or a non-retryable error surfaces.
    pub async fn generate(&self, prompt: impl Into<String>) -> ScrivanoResult<String> {
        self.generate_request(&GenerationRequest::from_prompt(prompt), &CancellationToken::new())
            .await
    }

    /// Generate text for a bare prompt, abortable through `cancel`.
    ///
    /// # Errors
    ///
    /// As [`TextGenerator::generate`]; cancellation surfaces as a
    /// dispatch error.
    pub async fn generate_with_cancel(
        &self,
        prompt: impl Into<String>,
        cancel: &CancellationToken,
    ) -> ScrivanoResult<String> {
        self.generate_request(&GenerationRequest::from_prompt(prompt), cancel)
            .await
    }

    /// Generate text for a fully specified request.
    ///
    /// # Errors
    ///
    /// As [`TextGenerator::generate`].
    pub async fn generate_request(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> ScrivanoResult<String> {
        self.dispatcher
            .dispatch(request, cancel)
            .await
            .map_err(ScrivanoError::from)
    }

    /// Availability snapshot for UI feedback. No side effects.
    pub fn status(&self) -> DispatchStatus {
        self.dispatcher.status()
    }

    /// Clear every credential's failure counter (manual escape hatch).
    pub fn reset_failures(&self) {
        self.dispatcher.reset_failures();
    }
}
