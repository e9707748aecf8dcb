//! Error types for the catalog module

use thiserror::Error;

/// Error type for catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Missing or invalid connection settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Data API answered with an `errors` array
    #[error("Data API error: {message}")]
    Api {
        /// Joined error messages
        message: String,
    },

    /// Non-success HTTP status
    #[error("Data API returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The response could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// A similarity query needs a stored vector the document lacks
    #[error("Movie {0} has no embedding vector")]
    MissingVector(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Decode(err.to_string())
    }
}
