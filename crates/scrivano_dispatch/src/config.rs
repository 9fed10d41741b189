//! Policy configuration for dispatch.
//!
//! Configuration loads from TOML with a precedence system:
//! - Bundled defaults (include_str! from scrivano.toml)
//! - User overrides (./scrivano.toml or ~/.config/scrivano/scrivano.toml)
//!
//! The dispatch policy constants are owned by this crate; applications
//! supply only the credential list.

use config::{Config, File, FileFormat};
use scrivano_error::{ConfigError, ScrivanoError, ScrivanoResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

fn default_max_requests_per_credential() -> usize {
    10
}
fn default_window_secs() -> u64 {
    60
}
fn default_min_interval_ms() -> u64 {
    2_000
}
fn default_failure_threshold() -> u32 {
    3
}
fn default_max_total_attempts() -> u32 {
    5
}
fn default_max_schedule_wait_ms() -> u64 {
    15_000
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_all_disabled_wait_secs() -> u64 {
    30
}

/// Scheduling and retry limits applied to every credential.
///
/// These are the policy constants of the dispatch core. Durations are
/// stored as plain integers so the struct deserializes directly from TOML;
/// the accessor methods convert to [`Duration`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DispatchPolicy {
    /// Maximum requests per credential inside one sliding window
    #[serde(default = "default_max_requests_per_credential")]
    pub max_requests_per_credential: usize,

    /// Sliding window duration in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Minimum gap between two requests on the same credential, in milliseconds
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Consecutive failures before a credential is disabled
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Attempt ceiling for one logical dispatch
    #[serde(default = "default_max_total_attempts")]
    pub max_total_attempts: u32,

    /// Longest scheduler wait the dispatcher will sit out, in milliseconds
    #[serde(default = "default_max_schedule_wait_ms")]
    pub max_schedule_wait_ms: u64,

    /// Hard timeout for a single network call, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fallback wait reported when every credential is disabled, in seconds
    #[serde(default = "default_all_disabled_wait_secs")]
    pub all_disabled_wait_secs: u64,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            max_requests_per_credential: default_max_requests_per_credential(),
            window_secs: default_window_secs(),
            min_interval_ms: default_min_interval_ms(),
            failure_threshold: default_failure_threshold(),
            max_total_attempts: default_max_total_attempts(),
            max_schedule_wait_ms: default_max_schedule_wait_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            all_disabled_wait_secs: default_all_disabled_wait_secs(),
        }
    }
}

impl DispatchPolicy {
    /// Sliding window duration.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Minimum inter-request interval per credential.
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Longest scheduler wait the dispatcher accepts before failing fast.
    pub fn max_schedule_wait(&self) -> Duration {
        Duration::from_millis(self.max_schedule_wait_ms)
    }

    /// Hard per-call network timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Fallback wait when every credential is disabled by failures.
    pub fn all_disabled_wait(&self) -> Duration {
        Duration::from_secs(self.all_disabled_wait_secs)
    }
}

fn default_rate_limit_base_ms() -> u64 {
    2_000
}
fn default_rate_limit_jitter_ms() -> u64 {
    1_000
}
fn default_service_base_ms() -> u64 {
    4_000
}
fn default_service_jitter_ms() -> u64 {
    2_000
}
fn default_max_delay_ms() -> u64 {
    30_000
}

/// Per-class backoff parameters.
///
/// Service failures use a larger base than rate-limit waits, and each class
/// carries its own jitter ceiling, to keep concurrent callers sharing the
/// pool from retrying in lockstep.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackoffConfig {
    /// Base delay for rate-limit failures, in milliseconds
    #[serde(default = "default_rate_limit_base_ms")]
    pub rate_limit_base_ms: u64,

    /// Jitter ceiling for rate-limit failures, in milliseconds
    #[serde(default = "default_rate_limit_jitter_ms")]
    pub rate_limit_jitter_ms: u64,

    /// Base delay for service-class failures, in milliseconds
    #[serde(default = "default_service_base_ms")]
    pub service_base_ms: u64,

    /// Jitter ceiling for service-class failures, in milliseconds
    #[serde(default = "default_service_jitter_ms")]
    pub service_jitter_ms: u64,

    /// Cap on any single computed delay, in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            rate_limit_base_ms: default_rate_limit_base_ms(),
            rate_limit_jitter_ms: default_rate_limit_jitter_ms(),
            service_base_ms: default_service_base_ms(),
            service_jitter_ms: default_service_jitter_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.95
}
fn default_top_k() -> u32 {
    40
}
fn default_max_output_tokens() -> u32 {
    8_192
}
fn default_safety_threshold() -> String {
    "BLOCK_MEDIUM_AND_ABOVE".to_string()
}

/// Default generation parameters applied when a request leaves them unset.
///
/// Consumed by backend crates when building the upstream request body.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GenerationDefaults {
    /// Upstream model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Top-k sampling cutoff
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Output token ceiling
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Content-safety blocking threshold sent with every request
    #[serde(default = "default_safety_threshold")]
    pub safety_threshold: String,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
            safety_threshold: default_safety_threshold(),
        }
    }
}

/// Top-level scrivano configuration.
///
/// # Example
///
/// ```no_run
/// use scrivano_dispatch::ScrivanoConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ScrivanoConfig::load()?;
/// assert!(config.dispatch.max_total_attempts > 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct ScrivanoConfig {
    /// Scheduling and retry limits
    #[serde(default)]
    pub dispatch: DispatchPolicy,

    /// Backoff parameters
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Generation parameter defaults
    #[serde(default)]
    pub generation: GenerationDefaults,
}

impl ScrivanoConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ScrivanoResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ScrivanoError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ScrivanoError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override
    /// earlier):
    /// 1. Bundled defaults (scrivano.toml shipped with the library)
    /// 2. User config in home directory (~/.config/scrivano/scrivano.toml)
    /// 3. User config in current directory (./scrivano.toml)
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> ScrivanoResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        // Bundled default configuration
        const DEFAULT_CONFIG: &str = include_str!("../../../scrivano.toml");

        let mut builder = Config::builder()
            // Start with bundled defaults
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        // Add user config from home directory (optional)
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/scrivano/scrivano.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        // Add user config from current directory (optional, highest precedence)
        builder = builder.add_source(File::with_name("scrivano").required(false));

        builder
            .build()
            .map_err(|e| {
                ScrivanoError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ScrivanoError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }
}
