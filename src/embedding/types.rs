//! Request options and wire types for the embeddings API

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default embedding model
pub const DEFAULT_MODEL: &str = "text-embedding-3-large";

/// Default embedding dimensions
pub const DEFAULT_DIMENSIONS: usize = 512;

/// Per-call options for [`EmbeddingClient::embed`](super::EmbeddingClient::embed)
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedOptions {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Read from and write to the client's cache
    pub use_cache: bool,

    /// Embedding model name
    pub model: String,

    /// Requested vector length
    pub dimensions: usize,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            use_cache: true,
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

impl EmbedOptions {
    /// Set the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Enable or disable the cache for this call
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the vector length
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }
}

/// Options for [`EmbeddingClient::embed_batch`](super::EmbeddingClient::embed_batch)
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Options applied to every prompt
    pub embed: EmbedOptions,

    /// Prompts embedded concurrently per chunk
    pub batch_size: usize,

    /// Pause between consecutive chunks
    pub batch_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            embed: EmbedOptions::default(),
            batch_size: 5,
            batch_delay: Duration::from_millis(2000),
        }
    }
}

impl BatchOptions {
    /// Set the per-prompt options
    pub fn with_embed_options(mut self, embed: EmbedOptions) -> Self {
        self.embed = embed;
        self
    }

    /// Set the chunk size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the pause between chunks
    pub fn with_batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }
}

/// Body of `POST /v1/embeddings`
#[derive(Debug, Serialize)]
pub(crate) struct EmbeddingRequest<'a> {
    pub input: &'a str,
    pub model: &'a str,
    pub dimensions: usize,
}

/// Successful embeddings response
#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingResponse {
    #[serde(default)]
    pub data: Option<Vec<EmbeddingData>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingData {
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

/// Error body returned with 4xx responses
#[derive(Debug, Deserialize)]
pub(crate) struct ProviderErrorBody {
    pub error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProviderErrorDetail {
    pub message: Option<String>,
}
