//! Cache layer
//!
//! In-process cache (moka) with tag-based invalidation. Cached values are
//! stored under `"<tag>:<key>"`, and revalidating a tag drops every key
//! under it, so the next read recomputes from the database.
//!
//! # Usage
//!
//! ```rust,ignore
//! use listora::cache::{create_cache, CacheLayer};
//!
//! let cache = create_cache(&config.cache);
//! cache.set_tagged("faqs-sitemap", "entries", &entries).await?;
//! cache.revalidate_tag("faqs-sitemap").await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// Generic methods make this trait unusable as `dyn CacheLayer`; share a
/// concrete implementation behind [`SharedCache`] instead.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Store a value until it is invalidated or evicted
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all values matching a glob pattern, returning how many were removed
    async fn delete_pattern(&self, pattern: &str) -> Result<u64>;

    /// Clear all cache entries
    async fn clear(&self) -> Result<()>;
}

/// Shared cache handle
pub type SharedCache = Arc<MemoryCache>;

/// Key of `key` within `tag`
/// Key of a tagged entry at a given tag generation
pub fn tag_key(tag: &str, generation: u64, key: &str) -> String {
    format!("{}:{}:{}", tag, generation, key)
}

impl MemoryCache {
    pub async fn get_tagged<T: DeserializeOwned + Send>(
        &self,
        tag: &str,
        key: &str,
    ) -> Result<Option<T>> {
        self.get(&tag_key(tag, self.generation(tag), key)).await
    }

    pub async fn set_tagged<T: Serialize + Send + Sync>(
        &self,
        tag: &str,
        key: &str,
        value: &T,
    ) -> Result<()> {
        self.set_tagged_at(tag, self.generation(tag), key, value)
            .await
            .map(|_| ())
    }

    /// Store a value computed while `generation` was current.
    ///
    /// Returns `false` and keeps nothing when the tag was revalidated in the
    /// meantime.
    pub async fn set_tagged_at<T: Serialize + Send + Sync>(
        &self,
        tag: &str,
        generation: u64,
        key: &str,
        value: &T,
    ) -> Result<bool> {
        if self.generation(tag) != generation {
            return Ok(false);
        }

        let full_key = tag_key(tag, generation, key);
        self.set(&full_key, value).await?;

        // A revalidation that raced the insert may have swept before it landed.
        if self.generation(tag) != generation {
            self.delete(&full_key).await?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Drop every entry stored under `tag`
    pub async fn revalidate_tag(&self, tag: &str) -> Result<u64> {
        let generation = self.bump_generation(tag);
        let removed = self.delete_pattern(&format!("{}:*", tag)).await?;
        tracing::debug!(tag, generation, removed, "Revalidated cache tag");
        Ok(removed)
    }
}

pub fn create_cache(config: &CacheConfig) -> SharedCache {
    Arc::new(MemoryCache::with_capacity(config.capacity))
}
