//! # Embedding Client Module
//!
//! This module turns text prompts into embedding vectors through a remote embeddings
//! API, adding the resilience the raw endpoint lacks.
//!
//! ## Key Components
//!
//! - `EmbeddingClient`: issues requests, classifies failures and retries with backoff
//! - `EmbeddingCache`: exact-match memo of prompt to vector, owned by the client
//! - `RequestLimiter`: minimum spacing between requests of one client
//! - `RetryPolicy`: attempt budget and exponential backoff delays
//! - `EmbedOptions` / `BatchOptions`: per-call settings
//!
//! ## Features
//!
//! - Cache hits skip both the network and the limiter
//! - Credential, authentication and bad-request failures are never retried
//! - Upstream 429 responses honor the provider's `Retry-After` hint
//! - Batches run concurrently inside a chunk and pause between chunks
//!
//! Clones of a client share its cache and limiter; separately constructed clients
//! are fully independent.

mod batch;
pub mod cache;
mod client;
mod error;
pub mod limiter;
pub mod retry;
mod types;

pub use batch::read_prompts;
pub use cache::EmbeddingCache;
pub use client::EmbeddingClient;
pub use error::EmbeddingError;
pub use limiter::RequestLimiter;
pub use retry::RetryPolicy;
pub use types::{BatchOptions, DEFAULT_DIMENSIONS, DEFAULT_MODEL, EmbedOptions};

/// A vector embedding (f32 components)
pub type Embedding = Vec<f32>;
