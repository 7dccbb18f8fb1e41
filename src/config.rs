//! Routing configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::time::Duration;

use crate::error::ConfigError;

/// Default maximum referral hops per top-level query.
const DEFAULT_MAX_HOPS: usize = 10;
/// Default passages retrieved per specialist call.
const DEFAULT_TOP_K: usize = 5;
/// Default number of prior turns injected into specialist prompts.
const DEFAULT_HISTORY_WINDOW: usize = 10;
/// Default classifier max tokens. Decisions are a small JSON object.
const DEFAULT_CLASSIFIER_MAX_TOKENS: u32 = 256;
/// Default specialist max tokens.
const DEFAULT_SPECIALIST_MAX_TOKENS: u32 = 2048;
/// Default per-call timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Default max retries for transient generation failures.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay for exponential retry backoff, in milliseconds.
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Configuration for the routing core.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for classification calls (router and coordinators).
    pub classifier_model: String,
    /// Model for specialist answer generation.
    pub specialist_model: String,
    /// Maximum referral hops per top-level query.
    ///
    /// One hop is one specialist invocation. The [`ReferralGuard`] refuses
    /// any dispatch that would exceed this budget.
    ///
    /// [`ReferralGuard`]: crate::routing::ReferralGuard
    pub max_hops: usize,
    /// Passages retrieved per specialist call.
    pub top_k: usize,
    /// Number of prior turns injected into specialist prompts.
    pub history_window: usize,
    /// Maximum tokens for classification responses.
    pub classifier_max_tokens: u32,
    /// Maximum tokens for specialist responses.
    pub specialist_max_tokens: u32,
    /// Sampling temperature for specialist generation. Classification
    /// always runs at 0.0.
    pub temperature: f32,
    /// Per-call timeout for retrieval and generation.
    pub timeout: Duration,
    /// Maximum retry attempts per generation call.
    pub max_retries: u32,
    /// Base delay for exponential retry backoff.
    pub retry_backoff: Duration,
}

impl RoutingConfig {
    /// Creates a new builder for `RoutingConfig`.
    #[must_use]
    pub fn builder() -> RoutingConfigBuilder {
        RoutingConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`RoutingConfig`].
#[derive(Debug, Clone, Default)]
pub struct RoutingConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    classifier_model: Option<String>,
    specialist_model: Option<String>,
    max_hops: Option<usize>,
    top_k: Option<usize>,
    history_window: Option<usize>,
    classifier_max_tokens: Option<u32>,
    specialist_max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff: Option<Duration>,
}

impl RoutingConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("MIT_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("MIT_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("MIT_BASE_URL"))
                .ok();
        }
        if self.classifier_model.is_none() {
            self.classifier_model = std::env::var("MIT_CLASSIFIER_MODEL").ok();
        }
        if self.specialist_model.is_none() {
            self.specialist_model = std::env::var("MIT_SPECIALIST_MODEL").ok();
        }
        if self.max_hops.is_none() {
            self.max_hops = std::env::var("MIT_MAX_HOPS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.top_k.is_none() {
            self.top_k = std::env::var("MIT_TOP_K").ok().and_then(|v| v.parse().ok());
        }
        if self.history_window.is_none() {
            self.history_window = std::env::var("MIT_HISTORY_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.max_retries.is_none() {
            self.max_retries = std::env::var("MIT_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the classifier model.
    #[must_use]
    pub fn classifier_model(mut self, model: impl Into<String>) -> Self {
        self.classifier_model = Some(model.into());
        self
    }

    /// Sets the specialist model.
    #[must_use]
    pub fn specialist_model(mut self, model: impl Into<String>) -> Self {
        self.specialist_model = Some(model.into());
        self
    }

    /// Sets the hop budget.
    #[must_use]
    pub const fn max_hops(mut self, n: usize) -> Self {
        self.max_hops = Some(n);
        self
    }

    /// Sets the retrieval top-k.
    #[must_use]
    pub const fn top_k(mut self, n: usize) -> Self {
        self.top_k = Some(n);
        self
    }

    /// Sets the turn-history window.
    #[must_use]
    pub const fn history_window(mut self, n: usize) -> Self {
        self.history_window = Some(n);
        self
    }

    /// Sets the classifier max tokens.
    #[must_use]
    pub const fn classifier_max_tokens(mut self, n: u32) -> Self {
        self.classifier_max_tokens = Some(n);
        self
    }

    /// Sets the specialist max tokens.
    #[must_use]
    pub const fn specialist_max_tokens(mut self, n: u32) -> Self {
        self.specialist_max_tokens = Some(n);
        self
    }

    /// Sets the specialist sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the max retries.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the base retry backoff delay.
    #[must_use]
    pub const fn retry_backoff(mut self, delay: Duration) -> Self {
        self.retry_backoff = Some(delay);
        self
    }

    /// Builds the [`RoutingConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<RoutingConfig, ConfigError> {
        let api_key = self.api_key.ok_or(ConfigError::ApiKeyMissing)?;

        Ok(RoutingConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            classifier_model: self
                .classifier_model
                .unwrap_or_else(|| "gpt-5-mini-2025-08-07".to_string()),
            specialist_model: self
                .specialist_model
                .unwrap_or_else(|| "gpt-5.2-2025-12-11".to_string()),
            max_hops: self.max_hops.unwrap_or(DEFAULT_MAX_HOPS),
            top_k: self.top_k.unwrap_or(DEFAULT_TOP_K),
            history_window: self.history_window.unwrap_or(DEFAULT_HISTORY_WINDOW),
            classifier_max_tokens: self
                .classifier_max_tokens
                .unwrap_or(DEFAULT_CLASSIFIER_MAX_TOKENS),
            specialist_max_tokens: self
                .specialist_max_tokens
                .unwrap_or(DEFAULT_SPECIALIST_MAX_TOKENS),
            temperature: self.temperature.unwrap_or(0.0),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            retry_backoff: self
                .retry_backoff
                .unwrap_or(Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = RoutingConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.max_hops, DEFAULT_MAX_HOPS);
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert_eq!(config.history_window, DEFAULT_HISTORY_WINDOW);
        assert_eq!(config.classifier_model, "gpt-5-mini-2025-08-07");
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = RoutingConfig::builder().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = RoutingConfig::builder()
            .api_key("key")
            .provider("custom")
            .specialist_model("gpt-4o-mini")
            .max_hops(4)
            .top_k(3)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "custom");
        assert_eq!(config.specialist_model, "gpt-4o-mini");
        assert_eq!(config.max_hops, 4);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
