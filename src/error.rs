//! Error types for the routing core.
//!
//! The taxonomy separates retryable generation failures (timeouts, transient
//! network errors) from terminal ones (invalid requests, retry exhaustion).
//! Only a terminal generation failure is ever allowed to shape user-visible
//! output; every other condition degrades to a best-effort answer inside
//! the routing chain.

use thiserror::Error;

/// Errors from the generation service.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The call did not complete within the configured timeout. Retryable.
    #[error("generation call timed out after {timeout_secs}s")]
    Timeout {
        /// Timeout that was exceeded, in seconds.
        timeout_secs: u64,
    },

    /// Transient transport failure (connection reset, 5xx, rate limit).
    /// Retryable.
    #[error("transient generation failure: {message}")]
    Transient {
        /// Provider error description.
        message: String,
    },

    /// The request itself is invalid (bad model, malformed payload).
    /// Not retryable.
    #[error("invalid generation request: {message}")]
    InvalidRequest {
        /// Provider error description.
        message: String,
    },

    /// Retries exhausted without a successful response.
    #[error("generation failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last error observed.
        message: String,
    },
}

impl GenerationError {
    /// Whether this error is worth retrying.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transient { .. })
    }
}

/// Errors from the retrieval service.
///
/// An unknown collection is *not* an error — retrieval backends must return
/// empty results for it. This type covers genuine backend failures, which
/// the specialist downgrades to "no supporting documents".
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Backend failure (index unavailable, I/O error).
    #[error("retrieval backend error: {message}")]
    Backend {
        /// Backend error description.
        message: String,
    },
}

/// Configuration errors raised at assembly time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key was provided via builder or environment.
    #[error("API key not found. Set OPENAI_API_KEY or MIT_API_KEY")]
    ApiKeyMissing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GenerationError::Timeout { timeout_secs: 30 }.is_transient());
        assert!(
            GenerationError::Transient {
                message: "503".to_string()
            }
            .is_transient()
        );
        assert!(
            !GenerationError::InvalidRequest {
                message: "bad model".to_string()
            }
            .is_transient()
        );
        assert!(
            !GenerationError::RetriesExhausted {
                attempts: 3,
                message: "timeout".to_string()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_error_display() {
        let err = GenerationError::RetriesExhausted {
            attempts: 3,
            message: "connection reset".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("3 attempts"));
        assert!(text.contains("connection reset"));
    }
}
