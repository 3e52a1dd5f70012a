use std::process;

use log::error;

mod app;
mod config;
mod errors;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod store;
mod types;
mod utils;
mod validations;

use errors::AppError;

#[actix_web::main]
async fn main() {
    // Run the server with error handling for critical failures
    if let Err(err) = app::server().await {
        match err {
            AppError::Server(e) => {
                error!("Critical server error: {}", e);
                process::exit(1);
            }
            AppError::Config(e) => {
                error!("Critical configuration error: {}", e);
                process::exit(2);
            }
            AppError::Logger(e) => {
                // The logger may not be up, so stderr is the only channel left
                eprintln!("Critical logger error: {}", e);
                process::exit(3);
            }
            AppError::Storage(e) => {
                error!("Critical store error: {}", e);
                process::exit(4);
            }
            _ => {
                error!("Unexpected error: {}", err);
                process::exit(1);
            }
        }
    }
}
