//! Error types for the cinescope crate

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::embedding::EmbeddingError;

/// Result type for cinescope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cinescope operations
#[derive(Debug, Error)]
pub enum Error {
    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Catalog (retrieval store) operation failed
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Reading prompt files or other local input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
