//! In-memory embedding cache.
//!
//! Keys are `(char length, first 100 chars)` rather than the full text:
//! cheap to build for long units, and collisions need two texts with the
//! same length and the same opening, which in practice means the same unit.
//!
//! The cache is unbounded. Long-running hosts should call
//! [`EmbeddingCache::clear`] between logical scopes or build a fresh
//! detector per scope.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Characters of the text kept in a cache key.
pub const KEY_PREFIX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    len: usize,
    prefix: String,
}

impl CacheKey {
    fn new(text: &str) -> Self {
        Self {
            len: text.chars().count(),
            prefix: text.chars().take(KEY_PREFIX_CHARS).collect(),
        }
    }
}

/// Text → embedding cache, safe to share across threads.
///
/// ```rust
/// use seams::EmbeddingCache;
///
/// let cache = EmbeddingCache::new();
/// cache.insert("hello world", vec![1.0, 0.0]);
/// assert_eq!(cache.get("hello world"), Some(vec![1.0, 0.0]));
/// assert_eq!(cache.len(), 1);
///
/// cache.clear();
/// assert!(cache.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: Mutex<HashMap<CacheKey, Vec<f32>>>,
}

impl EmbeddingCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the embedding for `text`.
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        self.lock().get(&CacheKey::new(text)).cloned()
    }

    /// Store the embedding for `text`.
    pub fn insert(&self, text: &str, embedding: Vec<f32>) {
        self.lock().insert(CacheKey::new(text), embedding);
    }

    /// Number of cached embeddings.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every cached embedding.
    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock cannot leave the map half-written, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Vec<f32>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
