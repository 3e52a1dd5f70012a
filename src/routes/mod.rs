use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse, Responder};
use log::{debug, warn};

use crate::{
    errors::AppError,
    types::{AppState, HealthStatus, ResponsePayload, StoreHealth},
};

mod short_link;

const MAX_JSON_PAYLOAD: usize = 32 * 1024;

// Handler function for the root route "/"
async fn index() -> impl Responder {
    let welcome_message = ResponsePayload {
        status: 200,
        message: String::from("Welcome! POST a URL to /api/v1/shorten to shorten it."),
    };

    HttpResponse::Ok().json(welcome_message)
}

// Handler function for the health check endpoint
async fn health_check(data: web::Data<AppState>) -> impl Responder {
    let uptime = data.start_time.elapsed().as_secs();

    let store_health = match data.stores.health_check().await {
        Ok(()) => StoreHealth::Healthy,
        Err(e) => {
            warn!("Health check: store unreachable: {}", e);
            StoreHealth::Unhealthy
        }
    };

    let (status, mut response) = match store_health {
        StoreHealth::Healthy => ("OK", HttpResponse::Ok()),
        StoreHealth::Unhealthy => ("DEGRADED", HttpResponse::ServiceUnavailable()),
    };

    response.json(HealthStatus {
        status: String::from(status),
        version: data.version.clone(),
        store_health,
        uptime_seconds: uptime,
    })
}

// Undecodable bodies get the same JSON error shape as every other failure
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("Rejected request body: {}", err);
    AppError::BadRequest(format!("Bad Request: {}", err)).into()
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_PAYLOAD)
        .error_handler(json_error_handler)
}

// Configure all routes function
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config());
    cfg.route("/", web::get().to(index));
    cfg.route("/health", web::get().to(health_check));
    short_link::configure_routes(cfg);
}
