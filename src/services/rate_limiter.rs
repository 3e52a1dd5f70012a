// src/services/rate_limiter.rs - Per-client quota accounting
use std::{sync::Arc, time::Duration};

use log::{debug, warn};

use crate::errors::{AppError, StoreError};
use crate::models::RateLimitStatus;
use crate::store::KeyValueStore;

type Result<T> = std::result::Result<T, AppError>;

/// Fixed-window request quota keyed by client IP.
///
/// A client's counter is created with the full quota on its first request and
/// expires together with its window; later requests never extend the window.
/// The counter is only decremented after a request succeeds, via
/// [`RateLimiter::settle`].
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    quota: i64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, quota: i64, window: Duration) -> Self {
        Self {
            store,
            quota,
            window,
        }
    }

    /// Lets the request through unless the client's quota is used up.
    ///
    /// ### Errors
    /// * `AppError::RateLimited` - the counter is at or below zero
    /// * `AppError::Storage` - the store failed or holds a non-integer counter
    pub async fn admit(&self, client: &str) -> Result<()> {
        let Some(raw) = self.store.get(client).await? else {
            // First request in this window. NX so concurrent first requests
            // can't reset a counter another request already created.
            self.store
                .set_if_absent(client, &self.quota.to_string(), self.window)
                .await?;
            debug!("Opened rate-limit window for {}", client);
            return Ok(());
        };

        let remaining = parse_counter(client, &raw)?;
        if remaining <= 0 {
            let reset_minutes = self.reset_minutes(client).await?;
            warn!(
                "Rate limit exceeded for {} (resets in {} min)",
                client, reset_minutes
            );
            return Err(AppError::RateLimited { reset_minutes });
        }

        Ok(())
    }

    /// Consumes one request from the client's quota and reports what is left.
    ///
    /// If the window expired while the request was in flight there is no
    /// counter to charge; the next request opens a fresh window, so the full
    /// quota and window are reported.
    pub async fn settle(&self, client: &str) -> Result<RateLimitStatus> {
        if self.store.decrement(client).await?.is_none() {
            return Ok(self.fresh_window());
        }

        let Some(raw) = self.store.get(client).await? else {
            return Ok(self.fresh_window());
        };

        Ok(RateLimitStatus {
            remaining: parse_counter(client, &raw)?,
            reset_minutes: self.reset_minutes(client).await?,
        })
    }

    async fn reset_minutes(&self, client: &str) -> Result<u64> {
        Ok(self
            .store
            .ttl(client)
            .await?
            .map(|ttl| ttl.as_secs() / 60)
            .unwrap_or(0))
    }

    fn fresh_window(&self) -> RateLimitStatus {
        RateLimitStatus {
            remaining: self.quota,
            reset_minutes: self.window.as_secs() / 60,
        }
    }
}

fn parse_counter(client: &str, raw: &str) -> std::result::Result<i64, StoreError> {
    raw.trim().parse().map_err(|_| StoreError::InvalidValue {
        key: client.to_string(),
        value: raw.to_string(),
    })
}
