//! # cinescope - movie discovery over a hosted vector catalog
//!
//! This crate provides the retrieval layer behind a movie discovery front-end: an
//! embedding client for a remote text-embedding API and a recommendation strategy
//! that degrades from vector similarity to genre matching when the vector path fails.
//!
//! ## Features
//!
//! - Embedding client with exact-match caching, request spacing and retry/backoff
//! - Batched embedding with bounded concurrency and inter-batch pacing
//! - Data API client for the hosted `movies` collection
//! - Recommendations that report which strategy served them
//! - Async API with Tokio
//! - Structured logging with `tracing`
//!
//! ## Example
//!
//! ```rust,no_run
//! use cinescope::catalog::{DataApiCollection, MovieStore};
//! use cinescope::config::Settings;
//! use cinescope::embedding::{EmbedOptions, EmbeddingClient};
//! use cinescope::recommend::find_similar_or_fallback;
//!
//! #[tokio::main]
//! async fn main() -> cinescope::Result<()> {
//!     let settings = Settings::from_env();
//!     let movies = DataApiCollection::new(&settings.catalog)?;
//!
//!     if let Some(movie) = movies.find_by_id("tt0133093").await? {
//!         let outcome = find_similar_or_fallback(&movies, &movie).await;
//!         println!("{} via {}", outcome.heading(), outcome.strategy());
//!     }
//!
//!     let client = EmbeddingClient::new(settings.embedding)?;
//!     let query = client.embed("heist gone wrong", &EmbedOptions::default()).await?;
//!     for result in movies.find_similar(&query, 5).await? {
//!         println!("{}", result.movie.title);
//!     }
//!     Ok(())
//! }
//! ```

mod error;

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod recommend;

pub use error::{Error, Result};

/// Re-export of the most commonly used types
pub mod prelude {
    pub use crate::catalog::{Movie, MovieStore, SimilarMovie};
    pub use crate::embedding::{BatchOptions, EmbedOptions, Embedding, EmbeddingClient};
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::recommend::{RetrievalOutcome, find_similar_or_fallback};
}
