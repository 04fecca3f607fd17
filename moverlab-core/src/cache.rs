//! In-memory memoization for resolver and ranker output.
//!
//! Entries optionally expire after a TTL. Keys for ranked results are
//! content hashes of the symbol list and date window (see [`content_key`]),
//! so two requests for the same inputs share one entry.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Content-addressed cache key (blake3 hex digest).
pub type ContentKey = String;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

#[derive(Debug)]
pub struct MemoCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Option<Duration>,
}

impl<K: Eq + Hash, V: Clone> MemoCache<K, V> {
    /// `ttl = None` keeps entries until [`clear`](Self::clear).
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_fresh(&self, entry: &Entry<V>) -> bool {
        self.ttl.map_or(true, |ttl| entry.inserted_at.elapsed() < ttl)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if self.is_fresh(entry) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.lock().insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Return the cached value or compute, store and return a new one.
    ///
    /// The lock is not held while `compute` runs; errors are not cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(hit) = self.get(&key) {
            tracing::trace!("memo cache hit");
            return Ok(hit);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, expired ones included until next touched.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hash an ordered list of string parts into a cache key.
///
/// Parts are length-prefixed so `["AB", "C"]` and `["A", "BC"]` differ.
pub fn content_key<I, S>(parts: I) -> ContentKey
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        let bytes = part.as_ref().as_bytes();
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    hasher.finalize().to_hex().to_string()
}
