use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;

use super::{KeyValueStore, StoreResult};
use crate::errors::StoreError;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local store with per-key expiry.
///
/// Expired keys are dropped lazily on the next access to them. Every
/// operation runs under a single lock, so each one is atomic with respect to
/// concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Connection("memory store lock poisoned".to_string()))
    }

    /// Looks up a live entry, evicting it first if it has expired
    fn live<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut Entry> {
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.lock()?;
        Ok(Self::live(&mut entries, key, Instant::now()).map(|entry| entry.value.clone()))
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or_else(|| StoreError::TtlOutOfRange {
            key: key.to_string(),
            ttl_secs: ttl.as_secs(),
        })?;

        let mut entries = self.lock()?;
        if Self::live(&mut entries, key, now).is_some() {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(true)
    }

    async fn decrement(&self, key: &str) -> StoreResult<Option<i64>> {
        let mut entries = self.lock()?;
        let Some(entry) = Self::live(&mut entries, key, Instant::now()) else {
            return Ok(None);
        };

        let current: i64 = entry.value.parse().map_err(|_| StoreError::InvalidValue {
            key: key.to_string(),
            value: entry.value.clone(),
        })?;
        if current > 0 {
            entry.value = (current - 1).to_string();
            return Ok(Some(current - 1));
        }
        Ok(Some(current))
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        Ok(Self::live(&mut entries, key, now)
            .map(|entry| entry.expires_at.saturating_duration_since(now)))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test(start_paused = true)]
    async fn test_value_round_trips_until_ttl_elapses() {
        let store = MemoryStore::new();
        assert!(store
            .set_if_absent("abc123", "https://example.com/page", HOUR)
            .await
            .unwrap());

        tokio::time::advance(HOUR - Duration::from_secs(1)).await;
        assert_eq!(
            store.get("abc123").await.unwrap().as_deref(),
            Some("https://example.com/page")
        );

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("abc123").await.unwrap(), None);
        assert_eq!(store.ttl("abc123").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_if_absent_respects_live_keys_only() {
        let store = MemoryStore::new();
        assert!(store.set_if_absent("code", "first", HOUR).await.unwrap());
        assert!(!store.set_if_absent("code", "second", HOUR).await.unwrap());
        assert_eq!(store.get("code").await.unwrap().as_deref(), Some("first"));

        tokio::time::advance(HOUR).await;
        assert!(store.set_if_absent("code", "second", HOUR).await.unwrap());
        assert_eq!(store.get("code").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_reports_remaining_time() {
        let store = MemoryStore::new();
        store
            .set_if_absent("10.0.0.1", "10", Duration::from_secs(1800))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(
            store.ttl("10.0.0.1").await.unwrap(),
            Some(Duration::from_secs(1200))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_decrement_floors_at_zero_and_keeps_ttl() {
        let store = MemoryStore::new();
        store
            .set_if_absent("10.0.0.1", "2", Duration::from_secs(1800))
            .await
            .unwrap();

        assert_eq!(store.decrement("10.0.0.1").await.unwrap(), Some(1));
        assert_eq!(store.decrement("10.0.0.1").await.unwrap(), Some(0));
        assert_eq!(store.decrement("10.0.0.1").await.unwrap(), Some(0));
        assert_eq!(
            store.ttl("10.0.0.1").await.unwrap(),
            Some(Duration::from_secs(1800))
        );
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_is_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set_if_absent("forever", "https://example.com", Duration::MAX).await,
            Err(StoreError::TtlOutOfRange { .. })
        ));
        assert_eq!(store.get("forever").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_decrement_missing_key_does_not_create_it() {
        let store = MemoryStore::new();
        assert_eq!(store.decrement("nobody").await.unwrap(), None);
        assert_eq!(store.get("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_decrement_rejects_non_integer_value() {
        let store = MemoryStore::new();
        store.set_if_absent("k", "not-a-number", HOUR).await.unwrap();
        assert!(matches!(
            store.decrement("k").await,
            Err(StoreError::InvalidValue { .. })
        ));
    }
}
