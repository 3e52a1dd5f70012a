use redis::RedisError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not reach the store (client creation, connect, ping)
    #[error("Store connection error: {0}")]
    Connection(String),

    /// A command reached the store but failed
    #[error("Store command error: {0}")]
    Command(#[from] RedisError),

    /// A value exists but is not what the caller expects (e.g. non-integer counter)
    #[error("Invalid stored value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    /// The requested TTL is longer than the store can represent
    #[error("TTL of {ttl_secs}s for '{key}' is out of range")]
    TtlOutOfRange { key: String, ttl_secs: u64 },
}
