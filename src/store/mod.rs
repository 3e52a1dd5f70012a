//! Expiring key-value storage used for both service partitions.
//!
//! The service only needs a handful of primitives from its store: read a
//! value, create a value with a TTL when the key is free, decrement a counter
//! without going below zero, and read a key's remaining TTL. Both backends
//! implement those atomically for a single key.
//!
//! - [`RedisStore`] - one Redis logical database per partition
//! - [`MemoryStore`] - process-local map, for single-node runs and tests

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::warn;

use crate::config::{StoreBackend, StoreConfig};
use crate::errors::StoreError;

mod memory_store;
mod redis_store;

pub use self::memory_store::MemoryStore;
pub use self::redis_store::RedisStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the live value under `key`, or `None` if absent or expired
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` with the given TTL only if `key` holds no live value.
    ///
    /// ### Returns
    /// * `true` if the value was written, `false` if the key was already taken
    ///
    /// ### Errors
    /// * `StoreError::TtlOutOfRange` - the backend cannot represent `ttl`
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Atomically decrements the integer counter under `key`, floored at zero.
    /// The key's TTL is left untouched.
    ///
    /// ### Returns
    /// * `Some(value)` after the decrement, `None` if the key does not exist
    ///
    /// ### Errors
    /// * `StoreError::InvalidValue` - the stored value is not an integer
    async fn decrement(&self, key: &str) -> StoreResult<Option<i64>>;

    /// Remaining time to live of `key`. `None` if the key is absent or never expires.
    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// Cheap round trip used by the health endpoint
    async fn ping(&self) -> StoreResult<()>;
}

/// The two partitions the service works with
#[derive(Clone)]
pub struct Partitions {
    /// short code -> target URL
    pub links: Arc<dyn KeyValueStore>,
    /// client IP -> remaining requests in the current window
    pub quotas: Arc<dyn KeyValueStore>,
}

impl Partitions {
    /// Opens both partitions on the configured backend
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        match config.backend {
            StoreBackend::Redis => {
                let links = RedisStore::connect(&config.redis_url, config.links_db).await?;
                let quotas = RedisStore::connect(&config.redis_url, config.quota_db).await?;
                Ok(Self {
                    links: Arc::new(links),
                    quotas: Arc::new(quotas),
                })
            }
            StoreBackend::Memory => {
                warn!("Using in-memory store: links and quotas are lost on restart");
                Ok(Self {
                    links: Arc::new(MemoryStore::new()),
                    quotas: Arc::new(MemoryStore::new()),
                })
            }
        }
    }

    /// Pings both partitions; `Ok` only if both answer
    pub async fn health_check(&self) -> StoreResult<()> {
        self.links.ping().await?;
        self.quotas.ping().await
    }
}
