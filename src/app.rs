use std::time::Instant;

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{debug, info};

use crate::{
    config::{Config, Environment},
    errors::AppError,
    middleware::RequestLogger,
    routes,
    services::ShortenerService,
    store::Partitions,
    types::AppState,
};

// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;

// Setup logging with custom format and configuration
fn setup_logging(config: &Config) -> Result<(), AppError> {
    let log_level = match config.app.environment {
        Environment::Development => config.app.log_level.clone(),
        Environment::Testing => "debug,actix_web=info".to_string(),
        Environment::Production => "info,actix_web=warn".to_string(),
    };

    let env = Env::default()
        .filter_or("RUST_LOG", log_level)
        .write_style_or("RUST_LOG_STYLE", "always");

    env_logger::try_init_from_env(env)
        .map_err(|e| AppError::Logger(format!("Failed to initialize logger: {}", e)))
}

pub async fn server() -> AppResult<()> {
    let config = Config::load()?;

    setup_logging(&config)?;

    let start_time = Instant::now();

    info!("Starting {} v{}", config.app.name, config.app.version);
    info!("Environment: {:?}", config.app.environment);
    info!(
        "Binding to {}:{} with {} workers",
        config.server.host, config.server.port, config.server.workers
    );
    info!(
        "Short links served under '{}', quota {} per {}s window",
        config.shortener.domain,
        config.shortener.api_quota,
        config.shortener.rate_limit_window.as_secs()
    );

    if config.app.environment == Environment::Development {
        debug!("Debug logging enabled");
        debug!("Full configuration: {:?}", config);
    }

    // Both partitions are shared by every worker
    let stores = Partitions::connect(&config.store).await?;
    let shortener = web::Data::new(ShortenerService::new(
        stores.links.clone(),
        stores.quotas.clone(),
        config.shortener.clone(),
    ));
    let state = web::Data::new(AppState {
        start_time,
        version: config.app.version.clone(),
        stores,
    });

    let enable_debug_logging = config.app.environment != Environment::Production;
    let app_config = web::Data::new(config.clone());

    let log_format = if enable_debug_logging {
        "%a \"%r\" %s %b %T \"%{Referer}i\" \"%{User-Agent}i\" %{X-Request-ID}o"
    } else {
        "%a \"%r\" %s %b %T"
    };

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(shortener.clone())
            // Make the full configuration available to handlers
            .app_data(app_config.clone())
            .wrap(RequestLogger::new(enable_debug_logging))
            // Registered last so it sees the request id set by RequestLogger
            .wrap(Logger::new(log_format))
            .configure(routes::configure_routes)
    })
    .workers(config.server.workers)
    .bind((config.server.host.to_string(), config.server.port))?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
