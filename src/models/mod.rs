mod short_link;

pub use short_link::{RateLimitStatus, ShortenRequest, ShortenResponse, MAX_EXPIRY_HOURS};
