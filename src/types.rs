use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::errors::AppError;
use crate::store::Partitions;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Serialize, Deserialize)]
pub struct ResponsePayload {
    pub status: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreHealth {
    Healthy,
    Unhealthy,
}

#[derive(Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub store_health: StoreHealth,
    pub uptime_seconds: u64,
}

// Shared application state
pub struct AppState {
    pub start_time: Instant,
    pub version: String,
    pub stores: Partitions,
}
