/*!
 * Context-aware translation caching.
 *
 * Every chunk translation is stored under a SHA-256 key over the chunk text,
 * the language pair, the model+stage tag and a hash of the preceding chunk's
 * output. The last component matters: prompts embed the tail of the previous
 * chunk, so the same paragraph translated after different context is a
 * different cache entry.
 *
 * Storage is pluggable through [`CacheStore`]. The in-memory store lives here;
 * the SQLite store lives in [`crate::database`].
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::errors::CacheError;

/// Prefix of the placeholder produced for chunks that could not be translated
pub const FAILURE_SENTINEL_PREFIX: &str = "[TRANSLATION_FAILED";

/// Default number of hex characters kept from the context hash
pub const DEFAULT_CONTEXT_HASH_LENGTH: usize = 32;

/// Build the failure placeholder for a chunk
pub fn failure_sentinel(chunk: &str) -> String {
    format!("{}: {}...]", FAILURE_SENTINEL_PREFIX, truncate_text(chunk, 50))
}

/// Whether `text` is a failure placeholder rather than a translation
pub fn is_failure_sentinel(text: &str) -> bool {
    text.trim_start().starts_with(FAILURE_SENTINEL_PREFIX)
}

/// One stored translation
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Content hash key
    pub key: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Chunk text that was translated
    pub original_text: String,
    /// Stage-1 output
    pub draft_text: String,
    /// Accepted output for the stage the key was written under
    pub final_text: String,
    /// Model + stage tag
    pub model: String,
    /// First write time
    pub created_at: DateTime<Utc>,
    /// Last read or write time
    pub last_used: DateTime<Utc>,
}

/// Cached texts handed back to the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct CachedTranslation {
    /// Stage-1 output
    pub draft_text: String,
    /// Accepted output
    pub final_text: String,
}

/// Entry counts reported by a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StoreStats {
    /// Number of entries
    pub total_entries: usize,
    /// Entries read or written in the last 24 hours
    pub entries_last_24h: usize,
}

/// Cache statistics including the hit/miss counters of this handle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: usize,
    /// Lookups that missed
    pub misses: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
    /// Entry counts from the store
    pub store: StoreStats,
}

/// Key/value storage behind the translation cache.
///
/// Implementations must make each `set` atomic per key: a concurrent `get`
/// sees either the old entry or the new one.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch an entry and refresh its `last_used` timestamp
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert or replace an entry
    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError>;

    /// Remove entries unused for more than `max_age_days`, returning how many went
    async fn cleanup(&self, max_age_days: u32) -> Result<usize, CacheError>;

    /// Remove every entry, returning how many went
    async fn clear(&self) -> Result<usize, CacheError>;

    /// Entry counts
    async fn stats(&self) -> Result<StoreStats, CacheError>;
}

/// Process-local cache store
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCacheStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let mut entries = self.entries.write();
        Ok(entries.get_mut(key).map(|entry| {
            entry.last_used = Utc::now();
            entry.clone()
        }))
    }

    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.entries.write().insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn cleanup(&self, max_age_days: u32) -> Result<usize, CacheError> {
        let cutoff = Utc::now() - Duration::days(i64::from(max_age_days));
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.last_used >= cutoff);
        Ok(before - entries.len())
    }

    async fn clear(&self) -> Result<usize, CacheError> {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }

    async fn stats(&self) -> Result<StoreStats, CacheError> {
        let cutoff = Utc::now() - Duration::hours(24);
        let entries = self.entries.read();
        Ok(StoreStats {
            total_entries: entries.len(),
            entries_last_24h: entries.values().filter(|e| e.last_used >= cutoff).count(),
        })
    }
}

/// Translation cache shared by all jobs of a process
#[derive(Clone)]
pub struct TranslationCache {
    /// Backing storage
    store: Arc<dyn CacheStore>,

    /// Whether caching is enabled
    enabled: bool,

    /// Hex characters kept from context hashes
    context_hash_length: usize,

    /// Cache hit counter
    hits: Arc<AtomicUsize>,

    /// Cache miss counter
    misses: Arc<AtomicUsize>,
}

impl std::fmt::Debug for TranslationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationCache")
            .field("enabled", &self.enabled)
            .field("context_hash_length", &self.context_hash_length)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl TranslationCache {
    /// Create a cache over the given store
    pub fn new(store: Arc<dyn CacheStore>, enabled: bool) -> Self {
        Self {
            store,
            enabled,
            context_hash_length: DEFAULT_CONTEXT_HASH_LENGTH,
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create an enabled cache backed by process memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()), true)
    }

    /// Create a cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()), false)
    }

    /// Set how many hex characters of the context hash are kept
    pub fn with_context_hash_length(mut self, length: usize) -> Self {
        self.context_hash_length = length.clamp(1, 64);
        self
    }

    /// Check if the cache is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Key for a (text, languages, model+stage, context) tuple
    pub fn cache_key(
        text: &str,
        source_language: &str,
        target_language: &str,
        model_tag: &str,
        context_hash: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(
            format!(
                "{}:{}:{}:{}:{}",
                text, source_language, target_language, model_tag, context_hash
            )
            .as_bytes(),
        );
        format!("{:x}", hasher.finalize())
    }

    /// Truncated hash of the preceding chunk's output; empty for the first chunk
    pub fn context_hash(&self, previous_output: &str) -> String {
        if previous_output.is_empty() {
            return String::new();
        }
        let mut hasher = Sha256::new();
        hasher.update(previous_output.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..self.context_hash_length.min(digest.len())].to_string()
    }

    /// Look up a translation. Failure placeholders and store errors count as misses.
    pub async fn get(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        model_tag: &str,
        context_hash: &str,
    ) -> Option<CachedTranslation> {
        if !self.enabled {
            return None;
        }

        let key = Self::cache_key(text, source_language, target_language, model_tag, context_hash);
        let entry = match self.store.get(&key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cache lookup failed, treating as miss: {}", e);
                None
            }
        };

        match entry {
            Some(entry) if !is_failure_sentinel(&entry.final_text) && !is_failure_sentinel(&entry.draft_text) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Cache hit for '{}' ({} -> {}, {})",
                    truncate_text(text, 30),
                    source_language,
                    target_language,
                    model_tag
                );
                Some(CachedTranslation {
                    draft_text: entry.draft_text,
                    final_text: entry.final_text,
                })
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Cache miss for '{}' ({} -> {}, {})",
                    truncate_text(text, 30),
                    source_language,
                    target_language,
                    model_tag
                );
                None
            }
        }
    }

    /// Store a translation. Returns whether anything was written.
    #[allow(clippy::too_many_arguments)]
    pub async fn set(
        &self,
        text: &str,
        final_text: &str,
        draft_text: &str,
        source_language: &str,
        target_language: &str,
        model_tag: &str,
        context_hash: &str,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        if is_failure_sentinel(final_text) || is_failure_sentinel(draft_text) {
            debug!("Refusing to cache a failure placeholder");
            return false;
        }

        let now = Utc::now();
        let entry = CacheEntry {
            key: Self::cache_key(text, source_language, target_language, model_tag, context_hash),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            original_text: text.to_string(),
            draft_text: draft_text.to_string(),
            final_text: final_text.to_string(),
            model: model_tag.to_string(),
            created_at: now,
            last_used: now,
        };

        match self.store.set(entry).await {
            Ok(()) => {
                debug!("Cached translation for '{}' ({})", truncate_text(text, 30), model_tag);
                true
            }
            Err(e) => {
                warn!("Failed to write cache entry: {}", e);
                false
            }
        }
    }

    /// Purge entries unused for more than `max_age_days`
    pub async fn cleanup(&self, max_age_days: u32) -> Result<usize, CacheError> {
        let removed = self.store.cleanup(max_age_days).await?;
        debug!("Cache cleanup removed {} entries older than {} days", removed, max_age_days);
        Ok(removed)
    }

    /// Empty the store and reset counters
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let removed = self.store.clear().await?;
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Translation cache cleared");
        Ok(removed)
    }

    /// Counters of this handle plus store entry counts
    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        Ok(CacheStats {
            hits,
            misses,
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
            store: self.store.stats().await?,
        })
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(max_chars).collect();
        format!("{}...", prefix)
    }
}
