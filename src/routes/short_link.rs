use actix_web::web;

use crate::handlers::{redirect_handler, shorten_handler};

// Configure short link routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/shorten", web::post().to(shorten_handler))
            // Path used by the first clients of the service
            .route("", web::post().to(shorten_handler)),
    );
    // Catch-all, must stay last
    cfg.route("/{code}", web::get().to(redirect_handler));
}
