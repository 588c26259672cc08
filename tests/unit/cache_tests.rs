/*!
 * Tests for translation cache functionality
 */

use std::sync::Arc;

use booktrans::translation::cache::{
    CachedTranslation, DEFAULT_CONTEXT_HASH_LENGTH, MemoryCacheStore, failure_sentinel,
};
use booktrans::TranslationCache;

#[tokio::test]
async fn test_cache_setThenGet_shouldReturnBothTexts() {
    let cache = TranslationCache::in_memory();
    assert!(cache.set("Hello", "Hola", "Hola borrador", "en", "es", "m_stage2", "").await);

    let hit = cache.get("Hello", "en", "es", "m_stage2", "").await;
    assert_eq!(
        hit,
        Some(CachedTranslation {
            draft_text: "Hola borrador".to_string(),
            final_text: "Hola".to_string(),
        })
    );
}

#[tokio::test]
async fn test_cache_get_withAnyKeyComponentChanged_shouldMiss() {
    let cache = TranslationCache::in_memory();
    cache.set("Hello", "Hola", "Hola", "en", "es", "m_stage1", "abc").await;

    assert!(cache.get("Hello", "de", "es", "m_stage1", "abc").await.is_none());
    assert!(cache.get("Hello", "en", "fr", "m_stage1", "abc").await.is_none());
    assert!(cache.get("Hello", "en", "es", "m_stage2", "abc").await.is_none());
    assert!(cache.get("Hello", "en", "es", "m_stage1", "").await.is_none());
    assert!(cache.get("Hello", "en", "es", "m_stage1", "abc").await.is_some());
}

#[tokio::test]
async fn test_cache_set_withFailureSentinel_shouldRefuse() {
    let cache = TranslationCache::in_memory();
    let sentinel = failure_sentinel("Hello world");

    assert!(!cache.set("Hello world", &sentinel, &sentinel, "en", "es", "m_stage1", "").await);
    assert!(cache.get("Hello world", "en", "es", "m_stage1", "").await.is_none());
}

#[tokio::test]
async fn test_cache_disabled_shouldNeverStore() {
    let cache = TranslationCache::disabled();
    assert!(!cache.set("Hello", "Hola", "Hola", "en", "es", "m", "").await);
    assert!(cache.get("Hello", "en", "es", "m", "").await.is_none());
}

#[tokio::test]
async fn test_cache_stats_shouldCountHitsAndMisses() {
    let store = Arc::new(MemoryCacheStore::new());
    let cache = TranslationCache::new(store.clone(), true);

    cache.get("Hello", "en", "es", "m", "").await;
    cache.set("Hello", "Hola", "Hola", "en", "es", "m", "").await;
    cache.get("Hello", "en", "es", "m", "").await;
    cache.get("Hello", "en", "es", "m", "").await;

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert!((stats.hit_rate - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(stats.store.total_entries, 1);
    assert_eq!(store.len(), 1);

    assert_eq!(cache.clear().await.unwrap(), 1);
    let stats = cache.stats().await.unwrap();
    assert_eq!((stats.hits, stats.misses), (0, 0));
}

#[tokio::test]
async fn test_cache_cleanup_withFreshEntries_shouldKeepThem() {
    let cache = TranslationCache::in_memory();
    cache.set("Hello", "Hola", "Hola", "en", "es", "m", "").await;

    assert_eq!(cache.cleanup(30).await.unwrap(), 0);
    assert_eq!(cache.stats().await.unwrap().store.total_entries, 1);
}

#[test]
fn test_contextHash_shouldBeEmptyForFirstChunkAndTruncatedOtherwise() {
    let cache = TranslationCache::in_memory();
    assert_eq!(cache.context_hash(""), "");

    let hash = cache.context_hash("El anciano caminó.");
    assert_eq!(hash.len(), DEFAULT_CONTEXT_HASH_LENGTH);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(hash, cache.context_hash("El anciano caminó."));

    let short = TranslationCache::in_memory().with_context_hash_length(8);
    assert_eq!(short.context_hash("El anciano caminó."), hash[..8]);
}

#[test]
fn test_cacheKey_shouldBeFullSha256Hex() {
    let key = TranslationCache::cache_key("Hello", "en", "es", "m_stage1", "");
    assert_eq!(key.len(), 64);
    assert_ne!(key, TranslationCache::cache_key("Hello", "en", "es", "m_stage2", ""));
}
