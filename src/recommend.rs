//! Recommendations with a genre fallback
//!
//! Vector similarity search is tried first. When it fails for any reason the
//! subject's primary genre is queried instead, and when that fails too the
//! outcome is empty. Retrieval errors are logged here and never returned.

use serde::Serialize;
use serde::ser::SerializeStruct;
use tracing::{error, info, instrument, warn};

use crate::catalog::{CatalogError, Movie, MovieStore, SimilarMovie};

/// Number of recommendations returned by default
pub const DEFAULT_LIMIT: usize = 5;

/// Result of a recommendation query, tagged with the strategy that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    /// Nearest neighbours by stored vector, with similarity scores
    Vector(Vec<SimilarMovie>),
    /// Movies sharing the subject's primary genre, unscored
    Fallback(Vec<Movie>),
    /// Both strategies failed
    None,
}

/// One rendered recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card<'a> {
    /// 1-based position
    pub rank: usize,
    pub movie: &'a Movie,
    /// Rounded similarity percentage, 0 when unscored
    pub similarity_percent: u32,
}

impl RetrievalOutcome {
    /// "vector", "fallback" or "none"
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Vector(_) => "vector",
            Self::Fallback(_) => "fallback",
            Self::None => "none",
        }
    }

    /// Whether the primary strategy was unavailable
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Vector(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Vector(results) => results.len(),
            Self::Fallback(results) => results.len(),
            Self::None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Section heading for the results
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Fallback(_) => "Movies from the same genre",
            _ => "Similar Films You May Like",
        }
    }

    /// Degraded-mode notice shown above fallback results
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Self::Fallback(_) => Some(
                "AI-powered recommendations are temporarily unavailable. \
                 Showing movies from the same genre instead.",
            ),
            _ => None,
        }
    }

    /// Ranked cards in result order
    pub fn cards(&self) -> Vec<Card<'_>> {
        match self {
            Self::Vector(results) => results
                .iter()
                .enumerate()
                .map(|(i, result)| Card {
                    rank: i + 1,
                    movie: &result.movie,
                    similarity_percent: similarity_percent(result.similarity),
                })
                .collect(),
            Self::Fallback(results) => results
                .iter()
                .enumerate()
                .map(|(i, movie)| Card {
                    rank: i + 1,
                    movie,
                    similarity_percent: 0,
                })
                .collect(),
            Self::None => Vec::new(),
        }
    }
}

impl Serialize for RetrievalOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RetrievalOutcome", 2)?;
        state.serialize_field("strategy", self.strategy())?;
        match self {
            Self::Vector(results) => state.serialize_field("results", results)?,
            Self::Fallback(results) => state.serialize_field("results", results)?,
            Self::None => state.serialize_field("results", &[] as &[Movie])?,
        }
        state.end()
    }
}

/// Similarity score as a whole percentage
///
/// The score is rounded to two decimals before scaling, so 0.8734 becomes 87.
/// An absent score is 0.
pub fn similarity_percent(similarity: Option<f64>) -> u32 {
    similarity
        .map(|s| (s * 100.0).round().clamp(0.0, u32::MAX as f64) as u32)
        .unwrap_or(0)
}

/// Recommendation settings
#[derive(Debug, Clone)]
pub struct Recommender {
    limit: usize,
}

impl Default for Recommender {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Recommender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of recommendations
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Recommend movies for `subject`, degrading to its genre and then to nothing
    #[instrument(skip(self, store, subject), fields(subject = %subject.id))]
    pub async fn recommend<S: MovieStore>(&self, store: &S, subject: &Movie) -> RetrievalOutcome {
        match self.by_vector(store, subject).await {
            Ok(results) => {
                info!("Found {} similar movies", results.len());
                return RetrievalOutcome::Vector(results);
            }
            Err(e) => error!("Vector search failed: {}", e),
        }

        warn!("Falling back to genre search");
        match self.by_genre(store, subject).await {
            Ok(results) => {
                info!("Found {} movies in the same genre", results.len());
                RetrievalOutcome::Fallback(results)
            }
            Err(e) => {
                error!("Fallback search failed: {}", e);
                RetrievalOutcome::None
            }
        }
    }

    async fn by_vector<S: MovieStore>(
        &self,
        store: &S,
        subject: &Movie,
    ) -> Result<Vec<SimilarMovie>, CatalogError> {
        let vector = subject
            .vector
            .as_deref()
            .ok_or_else(|| CatalogError::MissingVector(subject.id.clone()))?;

        // The nearest neighbour is the subject itself
        let mut results = store.find_similar(vector, self.limit + 1).await?;
        if !results.is_empty() {
            results.remove(0);
        }
        results.truncate(self.limit);
        Ok(results)
    }

    async fn by_genre<S: MovieStore>(
        &self,
        store: &S,
        subject: &Movie,
    ) -> Result<Vec<Movie>, CatalogError> {
        let mut results = store
            .find_by_genre(subject.primary_genre(), &subject.id, self.limit)
            .await?;
        results.truncate(self.limit);
        Ok(results)
    }
}

/// Recommend up to five movies for `subject` with the default settings
pub async fn find_similar_or_fallback<S: MovieStore>(
    store: &S,
    subject: &Movie,
) -> RetrievalOutcome {
    Recommender::default().recommend(store, subject).await
}
