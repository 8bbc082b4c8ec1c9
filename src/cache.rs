//! Best-effort Redis cache.
//!
//! Every operation is fail-open: a missing connection, a backend error or a
//! deserialization failure degrades to a cache miss (or a no-op write) and is
//! logged at warn level, never surfaced to the request. The server runs fine
//! with no Redis at all.

use redis::{AsyncCommands, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};

/// Key for the cached "all active collection points" list.
pub const POINTS_CACHE_KEY: &str = "collection_points:all";

/// Pattern covering every collection-point cache entry.
pub const POINTS_CACHE_PATTERN: &str = "collection_points:*";

/// Key for a single cached collection point.
pub fn point_cache_key(id: i32) -> String {
    format!("collection_points:{}", id)
}

/// Login rate-limit counter per client IP (24h window).
pub fn login_ip_key(ip: &str) -> String {
    format!("login:ip:{}", ip)
}

/// Login rate-limit counter per IP + identifier (1h window).
pub fn login_identifier_key(ip: &str, identifier: &str) -> String {
    format!("login:id:{}:{}", ip, identifier)
}

#[derive(Clone)]
pub struct CacheClient {
    conn: Option<ConnectionManager>,
}

impl CacheClient {
    /// Connect to Redis if a URL was configured. Connection failures leave
    /// the client disabled rather than aborting startup.
    pub async fn connect(redis_url: Option<&str>) -> Self {
        let Some(url) = redis_url else {
            tracing::warn!("REDIS_URL not set, running without cache");
            return CacheClient { conn: None };
        };

        let manager = match redis::Client::open(url) {
            Ok(client) => client.get_connection_manager().await,
            Err(e) => Err(e),
        };

        match manager {
            Ok(conn) => {
                tracing::info!("Redis connected");
                CacheClient { conn: Some(conn) }
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis, running without cache: {}", e);
                CacheClient { conn: None }
            }
        }
    }

    /// Client with no backing connection; every read misses, every write is
    /// a no-op.
    pub fn disabled() -> Self {
        CacheClient { conn: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    /// Fetch and deserialize a cached value. `None` on miss or any failure.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.conn.clone()?;

        let raw: Option<String> = match conn.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, "Cache read failed: {}", e);
                return None;
            }
        };

        let raw = raw?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, "Cache entry failed to deserialize: {}", e);
                None
            }
        }
    }

    /// Serialize and store a value with a TTL. Returns whether the write
    /// took effect.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, "Cache value failed to serialize: {}", e);
                return false;
            }
        };

        match conn.set_ex::<_, _, ()>(key, raw, ttl_seconds).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, "Cache write failed: {}", e);
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };

        match conn.del::<_, ()>(key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, "Cache delete failed: {}", e);
                false
            }
        }
    }

    /// Delete every key matching a glob pattern (KEYS + DEL).
    pub async fn delete_by_pattern(&self, pattern: &str) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };

        let keys: Vec<String> = match conn.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(pattern = %pattern, "Cache pattern scan failed: {}", e);
                return false;
            }
        };

        if keys.is_empty() {
            return true;
        }

        match conn.del::<_, ()>(keys).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(pattern = %pattern, "Cache pattern delete failed: {}", e);
                false
            }
        }
    }

    /// Increment a rate-limit counter, setting the window TTL on first use.
    /// `None` when the cache is unavailable (callers fail open).
    pub async fn increment_counter(&self, key: &str, ttl_seconds: u64) -> Option<i64> {
        let mut conn = self.conn.clone()?;

        let count: i64 = match conn.incr(key, 1).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(key = %key, "Counter increment failed: {}", e);
                return None;
            }
        };

        if count == 1 {
            if let Err(e) = conn.expire::<_, ()>(key, ttl_seconds as i64).await {
                tracing::warn!(key = %key, "Counter expiry failed: {}", e);
            }
        }

        Some(count)
    }

    pub async fn get_counter(&self, key: &str) -> Option<i64> {
        let mut conn = self.conn.clone()?;

        match conn.get::<_, Option<i64>>(key).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(key = %key, "Counter read failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_share_the_points_namespace() {
        assert_eq!(point_cache_key(7), "collection_points:7");
        // Pattern invalidation must cover both the list and per-id entries.
        assert!(POINTS_CACHE_KEY.starts_with("collection_points:"));
        assert!(POINTS_CACHE_PATTERN.ends_with('*'));
        assert!(point_cache_key(42).starts_with("collection_points:"));
    }

    #[test]
    fn rate_limit_keys_are_disjoint_per_client() {
        assert_ne!(login_ip_key("1.2.3.4"), login_ip_key("1.2.3.5"));
        assert_ne!(
            login_identifier_key("1.2.3.4", "ana@example.com"),
            login_identifier_key("1.2.3.4", "juan@example.com")
        );
    }

    #[tokio::test]
    async fn disabled_client_fails_open() {
        let cache = CacheClient::disabled();
        assert!(!cache.is_enabled());

        let miss: Option<Vec<String>> = cache.get_json(POINTS_CACHE_KEY).await;
        assert!(miss.is_none());
        assert!(!cache.set_json(POINTS_CACHE_KEY, &vec!["x"], 60).await);
        assert!(!cache.delete(POINTS_CACHE_KEY).await);
        assert!(!cache.delete_by_pattern(POINTS_CACHE_PATTERN).await);
        assert!(cache.increment_counter("login:ip:1.2.3.4", 60).await.is_none());
    }
}
