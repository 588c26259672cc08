/*!
 * SQLite persistence for the translation cache.
 */

use std::sync::Arc;

use anyhow::Result;

use crate::app_config::CacheConfig;
use crate::translation::cache::TranslationCache;

pub mod connection;
pub mod repository;
pub mod schema;

pub use connection::DatabaseConnection;
pub use repository::CacheRepository;

/// Open the cache described by `config`, backed by SQLite
pub fn open_cache(config: &CacheConfig) -> Result<TranslationCache> {
    if !config.enabled {
        return Ok(TranslationCache::disabled());
    }

    let repository = match &config.path {
        Some(path) => CacheRepository::new(DatabaseConnection::new(path)?),
        None => CacheRepository::new_default()?,
    };
    let store = Arc::new(repository);
    Ok(TranslationCache::new(store, true).with_context_hash_length(config.context_hash_length))
}
