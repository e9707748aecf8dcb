//! In-process embedding cache keyed by the exact prompt text

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use super::Embedding;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Embedding>,
    /// Insertion order, only maintained when a capacity is set
    order: VecDeque<String>,
}

/// Exact-match cache of prompt to embedding
///
/// Prompts are compared byte for byte; whitespace and case are significant. The
/// cache is unbounded unless created with [`EmbeddingCache::with_capacity_limit`],
/// in which case the oldest inserted prompt is evicted first.
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    state: Mutex<CacheState>,
    capacity: Option<usize>,
}

impl EmbeddingCache {
    /// Create an unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding at most `capacity` prompts
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: Some(capacity),
        }
    }

    /// Maximum number of entries, if bounded
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Look up the vector cached for `prompt`
    pub fn get(&self, prompt: &str) -> Option<Embedding> {
        self.state.lock().entries.get(prompt).cloned()
    }

    /// Store `vector` for `prompt`, replacing any previous vector
    pub fn put(&self, prompt: impl Into<String>, vector: Embedding) {
        let prompt = prompt.into();
        let mut state = self.state.lock();

        if let Some(existing) = state.entries.get_mut(&prompt) {
            *existing = vector;
            return;
        }

        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while state.entries.len() >= capacity {
                let Some(oldest) = state.order.pop_front() else {
                    break;
                };
                state.entries.remove(&oldest);
            }
            state.order.push_back(prompt.clone());
        }

        state.entries.insert(prompt, vector);
    }

    /// Discard every entry
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }

    /// Number of cached prompts
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
