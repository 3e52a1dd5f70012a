use std::io::Error as IoError;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

pub mod config;
pub mod store;

pub use config::ConfigError;
pub use store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    // Request-level errors, each maps to exactly one status
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("URL custom short is already taken")]
    ShortCodeTaken,
    #[error("Short code not found")]
    NotFound,
    #[error("Rate limit exceeded")]
    RateLimited { reset_minutes: u64 },
    #[error("You can't connect to this URL")]
    DomainRejected,
    #[error("Unable to connect to server")]
    Storage(#[source] StoreError),
    // Infrastructure/system errors
    #[error("Server error: {0}")]
    Server(#[from] IoError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Logger error: {0}")]
    Logger(String),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        error!("Store failure: {}", err);
        AppError::Storage(err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Flatten field errors into a single string
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let reasons = errs
                    .iter()
                    .map(|e| e.message.clone().unwrap_or_else(|| e.code.clone()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}: {}", field, reasons)
            })
            .collect::<Vec<_>>()
            .join("; ");
        AppError::BadRequest(message)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::InvalidUrl => StatusCode::BAD_REQUEST,
            AppError::ShortCodeTaken => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } | AppError::DomainRejected => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Storage(_)
            | AppError::Server(_)
            | AppError::Config(_)
            | AppError::Logger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::RateLimited { reset_minutes } => json!({
                "error": self.to_string(),
                "rate_limit_reset": reset_minutes,
            }),
            // Startup errors never reach a client, but don't leak details if they do
            AppError::Server(_) | AppError::Config(_) | AppError::Logger(_) => json!({
                "error": "Internal server error",
            }),
            _ => json!({ "error": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
