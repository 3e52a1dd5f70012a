use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validations::validate_custom_short;

/// Longest accepted link lifetime: 100 years. Both stores can represent
/// a TTL this long, so the requested expiry is always honoured exactly.
pub const MAX_EXPIRY_HOURS: u64 = 100 * 366 * 24;

/// Body of a shorten request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ShortenRequest {
    /// Target URL; the scheme may be omitted
    pub url: String,

    /// Caller-chosen short code. Empty is the same as not provided.
    #[serde(rename = "short", default)]
    #[validate(custom(function = "validate_custom_short"))]
    pub custom_short: Option<String>,

    /// Lifetime of the link in hours, at most [`MAX_EXPIRY_HOURS`].
    /// Absent or 0 falls back to the default.
    #[serde(rename = "expiry", default)]
    #[validate(range(max = MAX_EXPIRY_HOURS, message = "Expiry is too large"))]
    pub expiry_hours: Option<u64>,
}

impl ShortenRequest {
    /// The custom short code, if one was actually given
    pub fn custom_short(&self) -> Option<&str> {
        self.custom_short
            .as_deref()
            .filter(|code| !code.is_empty())
    }
}

/// Body of a successful shorten response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortenResponse {
    /// Canonical (HTTPS) target URL as stored
    pub url: String,

    /// Full short URL: `<domain>/<code>`
    #[serde(rename = "short")]
    pub short_url: String,

    #[serde(rename = "expiry")]
    pub expiry_hours: u64,

    #[serde(rename = "rate_limit")]
    pub rate_remaining: i64,

    #[serde(rename = "rate_limit_reset")]
    pub rate_limit_reset_minutes: u64,
}

/// Client quota state after a successful shorten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub remaining: i64,
    pub reset_minutes: u64,
}
