//! Movie catalog module
//!
//! This module provides the movie document types and the `MovieStore` seam through
//! which the rest of the crate queries the hosted collection.

mod data_api;
pub mod error;

pub use data_api::DataApiCollection;
pub use error::CatalogError;

use serde::{Deserialize, Serialize};

/// A movie document as stored in the collection
///
/// Field names on the wire match the document keys of the collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    /// Document identifier
    #[serde(rename = "_id")]
    pub id: String,

    /// Title of the movie
    #[serde(rename = "Title", default)]
    pub title: String,

    /// Comma-separated genres, e.g. "Action, Sci-Fi"
    #[serde(rename = "Genre", default)]
    pub genre: String,

    /// Plot summary
    #[serde(rename = "Plot", default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,

    /// Text the database vectorizes server-side
    #[serde(rename = "$vectorize", default, skip_serializing_if = "Option::is_none")]
    pub vectorize: Option<String>,

    /// Stored embedding
    #[serde(rename = "$vector", default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,

    /// Poster image URL
    #[serde(rename = "Poster", default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,

    #[serde(rename = "Director", default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,

    #[serde(rename = "Actors", default, skip_serializing_if = "Option::is_none")]
    pub actors: Option<String>,

    #[serde(rename = "BoxOffice", default, skip_serializing_if = "Option::is_none")]
    pub box_office: Option<String>,

    #[serde(rename = "Released", default, skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,

    #[serde(rename = "Runtime", default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,

    #[serde(rename = "Rated", default, skip_serializing_if = "Option::is_none")]
    pub rated: Option<String>,

    #[serde(rename = "imdbRating", default, skip_serializing_if = "Option::is_none")]
    pub imdb_rating: Option<String>,

    #[serde(rename = "Language", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Movie {
    /// The first genre listed, trimmed
    pub fn primary_genre(&self) -> &str {
        self.genre.split(',').next().unwrap_or_default().trim()
    }

    /// Plot, or the vectorized text when no plot is stored
    pub fn description(&self) -> Option<&str> {
        self.plot.as_deref().or(self.vectorize.as_deref())
    }

    /// Copy of the document without its embedding
    pub fn without_vector(&self) -> Self {
        Self {
            vector: None,
            ..self.clone()
        }
    }
}

/// A movie returned by a similarity query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarMovie {
    #[serde(flatten)]
    pub movie: Movie,

    /// Similarity to the query vector in [0, 1]
    #[serde(rename = "$similarity", default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

/// Query capabilities of the movie collection
///
/// Implemented over HTTP by [`DataApiCollection`]; tests substitute in-memory stores.
#[allow(async_fn_in_trait)]
pub trait MovieStore: Send + Sync {
    /// Fetch one movie by identifier
    async fn find_by_id(&self, id: &str) -> Result<Option<Movie>, CatalogError>;

    /// Movies nearest to `vector`, closest first, with similarity scores and
    /// without their stored vectors
    async fn find_similar(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarMovie>, CatalogError>;

    /// Movies whose genre contains `genre` (case-insensitive), excluding `exclude_id`
    async fn find_by_genre(
        &self,
        genre: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<Movie>, CatalogError>;

    /// Movies closest to free text, vectorized by the database
    async fn search_text(&self, term: &str, limit: usize) -> Result<Vec<Movie>, CatalogError>;

    /// Every movie in the collection, up to `limit` when given
    async fn list(&self, limit: Option<usize>) -> Result<Vec<Movie>, CatalogError>;
}
