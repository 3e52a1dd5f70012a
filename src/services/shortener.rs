// src/services/shortener.rs - Business logic
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, info, warn};
use validator::Validate;

use crate::config::ShortenerConfig;
use crate::errors::AppError;
use crate::models::{ShortenRequest, ShortenResponse};
use crate::services::RateLimiter;
use crate::store::KeyValueStore;
use crate::utils::generate_short_code;
use crate::validations::{enforce_https, is_self_referential, parse_target_url};

type Result<T> = std::result::Result<T, AppError>;

const MAX_GENERATION_ATTEMPTS: usize = 5;

#[async_trait]
pub trait ShortenerServiceTrait {
    /// Shortens `request.url` on behalf of `client` (its IP address)
    async fn shorten(&self, client: &str, request: ShortenRequest) -> Result<ShortenResponse>;

    /// Resolves a short code to its target URL
    async fn resolve(&self, code: &str) -> Result<String>;
}

pub struct ShortenerService {
    links: Arc<dyn KeyValueStore>,
    limiter: RateLimiter,
    config: ShortenerConfig,
}

impl ShortenerService {
    /// `links` holds code -> URL mappings, `quotas` holds IP -> remaining requests
    pub fn new(
        links: Arc<dyn KeyValueStore>,
        quotas: Arc<dyn KeyValueStore>,
        config: ShortenerConfig,
    ) -> Self {
        let limiter = RateLimiter::new(quotas, config.api_quota, config.rate_limit_window);
        Self {
            links,
            limiter,
            config,
        }
    }

    /// Picks the caller's code, or generates one that is currently free
    async fn resolve_short_code(&self, request: &ShortenRequest) -> Result<String> {
        if let Some(code) = request.custom_short() {
            if self.is_taken(code).await? {
                warn!("Custom short '{}' is already taken", code);
                return Err(AppError::ShortCodeTaken);
            }
            return Ok(code.to_string());
        }

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let code = generate_short_code(self.config.short_code_length);
            if !self.is_taken(&code).await? {
                return Ok(code);
            }
            debug!("Generated short '{}' collided (attempt {})", code, attempt);
        }

        warn!(
            "No free short code after {} attempts",
            MAX_GENERATION_ATTEMPTS
        );
        Err(AppError::ShortCodeTaken)
    }

    async fn is_taken(&self, code: &str) -> Result<bool> {
        Ok(self
            .links
            .get(code)
            .await?
            .is_some_and(|url| !url.is_empty()))
    }

    fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.config.domain.trim_end_matches('/'), code)
    }
}

#[async_trait]
impl ShortenerServiceTrait for ShortenerService {
    async fn shorten(&self, client: &str, request: ShortenRequest) -> Result<ShortenResponse> {
        request.validate()?;

        self.limiter.admit(client).await?;

        let target = parse_target_url(&request.url).ok_or(AppError::InvalidUrl)?;
        if is_self_referential(&target, &self.config.domain) {
            warn!("Rejected self-referential URL '{}' from {}", request.url, client);
            return Err(AppError::DomainRejected);
        }
        let url = enforce_https(&request.url);

        let code = self.resolve_short_code(&request).await?;

        let expiry_hours = match request.expiry_hours {
            Some(hours) if hours > 0 => hours,
            _ => self.config.default_expiry_hours,
        };
        let ttl = Duration::from_secs(expiry_hours * 3600);

        // NX closes the window between the uniqueness check and the write
        if !self.links.set_if_absent(&code, &url, ttl).await? {
            warn!("Short '{}' was taken while the request was in flight", code);
            return Err(AppError::ShortCodeTaken);
        }
        info!("Created short '{}' -> {} ({}h)", code, url, expiry_hours);

        let status = self.limiter.settle(client).await?;

        Ok(ShortenResponse {
            url,
            short_url: self.short_url(&code),
            expiry_hours,
            rate_remaining: status.remaining,
            rate_limit_reset_minutes: status.reset_minutes,
        })
    }

    async fn resolve(&self, code: &str) -> Result<String> {
        match self.links.get(code).await? {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(AppError::NotFound),
        }
    }
}
