//! Cache Module
//!
//! Redis connection management and caching utilities.
//!
//! This module provides:
//! - Redis connection management with automatic reconnection
//! - A `Cache` trait for abstracting cache operations
//! - `RedisCache` and an in-process `MemoryCache`
//! - The object-safe `ResponseStore` the response cache middleware uses
//! - Key builders for consistent cache key naming

mod cache_service;
mod memory_cache;
mod response_store;

pub use cache_service::{Cache, RedisCache};
pub use memory_cache::MemoryCache;
pub use response_store::{CachedResponse, ResponseStore};

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

/// Creates a Redis connection manager with automatic reconnection.
///
/// # Returns
/// * `Ok(ConnectionManager)` - On successful connection
/// * `Err(redis::RedisError)` - If connection fails
#[instrument(skip(url))]
pub async fn create_redis_client(url: &str) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Creates a `RedisCache` for the given URL with the application key prefix.
pub async fn create_redis_cache(url: &str) -> Result<RedisCache, redis::RedisError> {
    let conn = create_redis_client(url).await?;
    Ok(RedisCache::with_prefix(conn, keys::APP_PREFIX))
}

/// Cache key builders.
///
/// # Example
/// ```rust,ignore
/// use crud_api::infrastructure::cache::keys;
///
/// let key = keys::response("users", "/api/users?page=2");
/// ```
pub mod keys {
    /// Prefix applied to every key written by this service
    pub const APP_PREFIX: &str = "crud:";

    /// Prefix for cached HTTP responses (e.g., "response:users:/api/users")
    pub const RESPONSE: &str = "response:";

    /// Prefix for the per-resource set of cached response keys
    pub const RESPONSE_INDEX: &str = "response-index:";

    /// Generates a cached response key
    #[inline]
    pub fn response(namespace: &str, path_and_query: &str) -> String {
        format!("{}{}:{}", RESPONSE, namespace, path_and_query)
    }

    /// Generates the index key listing cached responses of a resource
    #[inline]
    pub fn response_index(namespace: &str) -> String {
        format!("{}{}", RESPONSE_INDEX, namespace)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_response_keys() {
            assert_eq!(
                response("users", "/api/users?page=2"),
                "response:users:/api/users?page=2"
            );
            assert_eq!(response_index("files"), "response-index:files");
        }
    }
}
