use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// Engine configuration module
/// This module handles the engine configuration including defaults,
/// per-provider tuning profiles, and validation.

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    /// Anthropic messages API
    #[default]
    Anthropic,
    /// OpenAI chat-completions API (or compatible server)
    OpenAI,
}

impl TranslationProvider {
    /// Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Anthropic => "Anthropic",
            Self::OpenAI => "OpenAI",
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAI),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider-specific tuning profile with conservative defaults.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    /// Maximum concurrent requests
    pub max_concurrent_requests: usize,
    /// Target requests per minute (for rate limiting)
    pub target_rpm: Option<u32>,
    /// Recommended sub-batch size for this provider
    pub recommended_batch_size: usize,
}

impl ProviderProfile {
    /// Get the tuned profile for a given provider
    pub fn for_provider(provider: TranslationProvider) -> Self {
        match provider {
            TranslationProvider::Anthropic => Self {
                // Anthropic has lower rate limits but larger context
                max_concurrent_requests: 3,
                target_rpm: Some(45),
                recommended_batch_size: 10,
            },
            TranslationProvider::OpenAI => Self {
                // OpenAI has good throughput but tighter token buckets
                max_concurrent_requests: 5,
                target_rpm: Some(60),
                recommended_batch_size: 10,
            },
        }
    }
}

/// Retry behavior configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryConfig {
    /// Maximum attempts including the first
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,

    /// Base backoff in milliseconds
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Ceiling for a single backoff sleep in milliseconds
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// Ceiling on cumulative backoff sleep in milliseconds
    #[serde(default = "default_total_wait_cap_ms")]
    pub total_wait_cap_ms: u64,

    /// Jitter fraction applied to each sleep (0.0 - 1.0)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            total_wait_cap_ms: default_total_wait_cap_ms(),
            jitter: default_jitter(),
        }
    }
}

/// Cache behavior configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Whether the translation cache is consulted at all
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Entry lifetime in seconds, `None` for no expiry
    #[serde(default)]
    pub ttl_secs: Option<u64>,

    /// Maximum entries retained, `None` for unbounded
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: None,
            max_entries: None,
        }
    }
}

/// Engine configuration for one provider.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Provider to dispatch translations to
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// API key
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service URL; empty for the provider's public endpoint
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Fragments per sub-batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Max concurrent sub-batch requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Optional cap on sub-batches dispatched per wave; waves run
    /// sequentially so a huge request cannot monopolize the gate
    #[serde(default)]
    pub max_wave_size: Option<usize>,

    /// Minimum sub-batch success rate for a job to be accepted
    #[serde(default = "default_min_success_rate")]
    pub min_success_rate: f64,

    /// Max chars per fragment; longer fragments are rejected by validation
    #[serde(default = "default_max_chars_per_fragment")]
    pub max_chars_per_fragment: usize,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens generated per sub-batch
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Rate limit (requests per minute); `None` disables window limiting
    #[serde(default = "default_rate_limit")]
    pub rate_limit: Option<u32>,

    /// Retry behavior
    #[serde(default)]
    pub retry: RetryConfig,

    /// Cache behavior
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_provider(TranslationProvider::Anthropic)
    }
}

impl EngineConfig {
    /// Create a configuration seeded from the provider's tuning profile
    pub fn for_provider(provider: TranslationProvider) -> Self {
        let profile = ProviderProfile::for_provider(provider);
        Self {
            provider,
            model: default_model_for(provider),
            api_key: String::new(),
            endpoint: String::new(),
            batch_size: profile.recommended_batch_size,
            concurrent_requests: profile.max_concurrent_requests,
            max_wave_size: None,
            min_success_rate: default_min_success_rate(),
            max_chars_per_fragment: default_max_chars_per_fragment(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            rate_limit: profile.target_rpm,
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Validate the configuration, surfacing fatal problems before any
    /// translation is dispatched.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("API key is missing".to_string());
        }
        self.validate_limits()
    }

    /// Validate the numeric knobs only. Used when the provider is injected
    /// directly and carries its own credentials.
    pub fn validate_limits(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name is missing".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".to_string());
        }
        if self.concurrent_requests == 0 {
            return Err("concurrent_requests must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_success_rate) {
            return Err(format!(
                "min_success_rate must be within 0.0..=1.0, got {}",
                self.min_success_rate
            ));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(format!(
                "retry.jitter must be within 0.0..=1.0, got {}",
                self.retry.jitter
            ));
        }
        if let Some(0) = self.max_wave_size {
            return Err("max_wave_size must be at least 1 when set".to_string());
        }
        Ok(())
    }
}

fn default_model() -> String {
    default_model_for(TranslationProvider::Anthropic)
}

fn default_model_for(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::Anthropic => "claude-3-haiku-20240307".to_string(),
        TranslationProvider::OpenAI => "gpt-4o-mini".to_string(),
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_concurrent_requests() -> usize {
    3
}

fn default_min_success_rate() -> f64 {
    0.7
}

fn default_max_chars_per_fragment() -> usize {
    4000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_rate_limit() -> Option<u32> {
    Some(45)
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_cap_ms() -> u64 {
    8000
}

fn default_total_wait_cap_ms() -> u64 {
    30000
}

fn default_jitter() -> f64 {
    0.2
}

fn default_cache_enabled() -> bool {
    true
}
