//! Content-addressed cache for parsed price files.
//!
//! Entries are keyed by the SHA-256 digest of the raw file bytes, so the same
//! upload under a different file name is recognised as a duplicate. The cache
//! is a plain value owned by the ingestion caller and is invalidated
//! explicitly.

use crate::error::Result;
use derive_more::From;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

/// SHA-256 digest of a file's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    /// Hash raw file contents.
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self(key)
    }

    /// Lower-case hexadecimal rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Cache usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that ran the loader.
    pub misses: u64,
    /// Entries currently held.
    pub entries: usize,
}

/// Cache of parsed files keyed by content hash.
#[derive(Debug)]
pub struct PanelCache<T> {
    entries: HashMap<ContentKey, T>,
    hits: u64,
    misses: u64,
}

impl<T> Default for PanelCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PanelCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached value for `bytes`, running `loader` on a miss.
    ///
    /// A failing loader leaves the cache unchanged.
    ///
    /// # Errors
    /// Propagates the loader's error.
    pub fn get_or_try_insert_with<F>(&mut self, bytes: &[u8], loader: F) -> Result<&T>
    where
        F: FnOnce(&[u8]) -> Result<T>,
    {
        let key = ContentKey::of(bytes);
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                tracing::debug!(key = %key, "cache hit");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                let value = loader(bytes)?;
                Ok(entry.insert(value))
            }
        }
    }

    /// Whether content identical to `bytes` is already cached.
    pub fn contains(&self, bytes: &[u8]) -> bool {
        self.entries.contains_key(&ContentKey::of(bytes))
    }

    /// Cached value for `key`.
    pub fn get(&self, key: &ContentKey) -> Option<&T> {
        self.entries.get(key)
    }

    /// Drop one entry, returning it if present.
    pub fn invalidate(&mut self, key: &ContentKey) -> Option<T> {
        self.entries.remove(key)
    }

    /// Usage counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}
