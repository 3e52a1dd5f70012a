use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use redis::{aio::ConnectionManager, AsyncCommands, Client, IntoConnectionInfo, Script};

use super::{KeyValueStore, StoreResult};
use crate::errors::StoreError;

// Decrement that never goes below zero and never creates the key.
// Returns nil when the key is missing.
const DECREMENT_WITH_FLOOR: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
    return false
end
if tonumber(current) == nil then
    return redis.error_reply('ERR value is not an integer')
end
if tonumber(current) > 0 then
    return redis.call('DECR', KEYS[1])
end
return tonumber(current)
"#;

// Largest EX Redis accepts before it adds the current time in milliseconds
const MAX_TTL_SECS: u64 = i64::MAX as u64 / 1000;

/// A single Redis logical database acting as one store partition.
///
/// Connections are multiplexed by `ConnectionManager`; every operation works
/// on its own cheap clone of the manager, so nothing is held across requests.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    decrement_script: Script,
    db: i64,
}

impl RedisStore {
    /// Connects to `base_url`, selects logical database `db` and verifies the
    /// connection with a PING.
    pub async fn connect(base_url: &str, db: i64) -> StoreResult<Self> {
        info!("Connecting to Redis database {}", db);

        let mut connection_info = base_url.into_connection_info().map_err(|e| {
            StoreError::Connection(format!("Invalid Redis URL: {}", e))
        })?;
        connection_info.redis.db = db;

        let client = Client::open(connection_info).map_err(|e| {
            StoreError::Connection(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            warn!("Failed to connect to Redis database {}: {}", db, e);
            StoreError::Connection(format!("Failed to connect to Redis: {}", e))
        })?;

        let store = Self {
            manager,
            decrement_script: Script::new(DECREMENT_WITH_FLOOR),
            db,
        };
        store.ping().await?;

        info!("Connected to Redis database {}", db);
        Ok(store)
    }

    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

/// Maps a TTL reply to a duration. Redis answers -2 for a missing key and
/// -1 for a key without expiry; both mean there is no remaining TTL.
fn ttl_from_reply(seconds: i64) -> Option<Duration> {
    u64::try_from(seconds).ok().map(Duration::from_secs)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.connection();
        let value: Option<String> = conn.get(key).await?;
        debug!("GET db{} {} -> {:?}", self.db, key, value);
        Ok(value)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        if ttl.as_secs() > MAX_TTL_SECS {
            return Err(StoreError::TtlOutOfRange {
                key: key.to_string(),
                ttl_secs: ttl.as_secs(),
            });
        }

        let mut conn = self.connection();
        // SET key value NX EX ttl replies OK on write, nil when the key exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        debug!(
            "SET NX db{} {} (ttl {}s) -> {}",
            self.db,
            key,
            ttl.as_secs(),
            reply.is_some()
        );
        Ok(reply.is_some())
    }

    async fn decrement(&self, key: &str) -> StoreResult<Option<i64>> {
        let mut conn = self.connection();
        let value: Option<i64> = self
            .decrement_script
            .key(key)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| match e.kind() {
                redis::ErrorKind::ExtensionError | redis::ErrorKind::ResponseError => {
                    StoreError::InvalidValue {
                        key: key.to_string(),
                        value: e.to_string(),
                    }
                }
                _ => StoreError::Command(e),
            })?;
        Ok(value)
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let mut conn = self.connection();
        let seconds: i64 = conn.ttl(key).await?;
        Ok(ttl_from_reply(seconds))
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| StoreError::Connection(format!("Redis PING failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_reply_mapping() {
        assert_eq!(ttl_from_reply(-2), None);
        assert_eq!(ttl_from_reply(-1), None);
        assert_eq!(ttl_from_reply(0), Some(Duration::ZERO));
        assert_eq!(ttl_from_reply(1800), Some(Duration::from_secs(1800)));
    }

    // The tests below need a live server: REDIS_URL=redis://... cargo test -- --ignored
    const TEST_DB: i64 = 15;

    async fn live_store() -> Option<RedisStore> {
        let url = std::env::var("REDIS_URL").ok()?;
        Some(RedisStore::connect(&url, TEST_DB).await.unwrap())
    }

    fn unique_key(prefix: &str) -> String {
        format!("{}:{}", prefix, uuid::Uuid::new_v4())
    }

    #[tokio::test]
    #[ignore = "requires a Redis server at REDIS_URL"]
    async fn test_redis_set_if_absent_and_ttl() {
        let Some(store) = live_store().await else {
            return;
        };
        let key = unique_key("link");

        assert!(store
            .set_if_absent(&key, "https://example.com", Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!store
            .set_if_absent(&key, "https://other.example", Duration::from_secs(60))
            .await
            .unwrap());
        assert_eq!(
            store.get(&key).await.unwrap().as_deref(),
            Some("https://example.com")
        );

        let ttl = store.ttl(&key).await.unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(60) && ttl >= Duration::from_secs(55));
        assert_eq!(store.ttl(&unique_key("missing")).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires a Redis server at REDIS_URL"]
    async fn test_redis_decrement_floors_at_zero() {
        let Some(store) = live_store().await else {
            return;
        };
        let key = unique_key("quota");
        store
            .set_if_absent(&key, "2", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.decrement(&key).await.unwrap(), Some(1));
        assert_eq!(store.decrement(&key).await.unwrap(), Some(0));
        assert_eq!(store.decrement(&key).await.unwrap(), Some(0));
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("0"));
        assert!(store.ttl(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    #[ignore = "requires a Redis server at REDIS_URL"]
    async fn test_redis_decrement_missing_key_does_not_create_it() {
        let Some(store) = live_store().await else {
            return;
        };
        let key = unique_key("quota");

        assert_eq!(store.decrement(&key).await.unwrap(), None);
        assert_eq!(store.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires a Redis server at REDIS_URL"]
    async fn test_redis_decrement_rejects_non_integer_value() {
        let Some(store) = live_store().await else {
            return;
        };
        let key = unique_key("quota");
        store
            .set_if_absent(&key, "lots", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(matches!(
            store.decrement(&key).await,
            Err(StoreError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    #[ignore = "requires a Redis server at REDIS_URL"]
    async fn test_redis_rejects_unrepresentable_ttl() {
        let Some(store) = live_store().await else {
            return;
        };
        let key = unique_key("link");

        let too_long = Duration::from_secs(MAX_TTL_SECS + 1);
        assert!(matches!(
            store.set_if_absent(&key, "https://example.com", too_long).await,
            Err(StoreError::TtlOutOfRange { .. })
        ));
        assert_eq!(store.get(&key).await.unwrap(), None);
    }
}
