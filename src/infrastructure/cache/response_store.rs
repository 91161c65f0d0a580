//! Response store.
//!
//! The object-safe view of a [`Cache`] used by the response cache
//! middleware: buffered responses plus a per-resource index of their keys so
//! a write can drop every cached read of that resource.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{keys, Cache};
use crate::shared::error::AppError;

/// A buffered response as kept in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

#[async_trait]
pub trait ResponseStore: Send + Sync {
    async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>, AppError>;

    /// Store `entry` under `key` and record the key in the namespace index.
    async fn save(
        &self,
        namespace: &str,
        key: &str,
        entry: &CachedResponse,
        ttl: u64,
    ) -> Result<(), AppError>;

    /// Drop every cached response of `namespace`, returning how many existed.
    async fn invalidate(&self, namespace: &str) -> Result<u64, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

#[async_trait]
impl<C: Cache> ResponseStore for C {
    async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>, AppError> {
        Cache::get(self, key).await
    }

    async fn save(
        &self,
        namespace: &str,
        key: &str,
        entry: &CachedResponse,
        ttl: u64,
    ) -> Result<(), AppError> {
        self.set_ex(key, entry, ttl).await?;
        self.add_to_set(&keys::response_index(namespace), key, ttl)
            .await
    }

    async fn invalidate(&self, namespace: &str) -> Result<u64, AppError> {
        let index = keys::response_index(namespace);
        let mut stale = self.set_members(&index).await?;
        stale.push(index);

        let count = self.delete_many(&stale).await?;
        debug!(namespace, count, "Response cache invalidated");
        Ok(count)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Cache::ping(self).await
    }
}
