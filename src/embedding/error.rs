//! # Embedding Error Types
//!
//! Failure classes of the embedding client. The split matters for retries:
//! configuration, authentication and bad-request failures surface immediately,
//! everything else is retried until the attempt budget runs out.

use thiserror::Error;

/// Errors produced while generating embeddings
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The client is missing required configuration (e.g. the API key)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The provider rejected the credential (HTTP 401)
    #[error("Invalid API key. Please check your OPENAI_API_KEY environment variable.")]
    Authentication,

    /// The provider rejected the request shape (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upstream throttling (HTTP 429) persisted through every attempt
    #[error(
        "Rate limit exceeded after {attempts} attempts. Please check your API quota and billing details."
    )]
    RateLimitExceeded {
        /// Attempts made
        attempts: u32,
    },

    /// The response did not carry a usable embedding
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Any other non-success status
    #[error("Provider error ({status}): {body}")]
    Provider {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Transport failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Every attempt failed; wraps the last failure
    #[error("Failed to generate embedding after {attempts} attempts. Last error: {source}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Failure of the final attempt
        source: Box<EmbeddingError>,
    },
}

impl EmbeddingError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::MalformedResponse(_) | Self::Provider { .. } | Self::Http(_)
        )
    }

    /// The failure behind an `Exhausted` error, or the error itself
    pub fn root(&self) -> &EmbeddingError {
        match self {
            Self::Exhausted { source, .. } => source.root(),
            other => other,
        }
    }
}
