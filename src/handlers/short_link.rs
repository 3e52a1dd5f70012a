use actix_web::{http::header::LOCATION, web, HttpRequest, HttpResponse, Responder};
use log::{debug, info, warn};

use crate::{
    config::Config,
    models::ShortenRequest,
    services::{ShortenerService, ShortenerServiceTrait},
    types::Result,
};

/// Shorten URL route handler
pub async fn shorten_handler(
    req: HttpRequest,
    body: web::Json<ShortenRequest>,
    service: web::Data<ShortenerService>,
    config: web::Data<Config>,
) -> Result<impl Responder> {
    let client = client_ip(&req, config.server.trust_proxy_headers);
    debug!("Shorten requested by {}", client);

    let response = service.shorten(&client, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Redirect route handler
pub async fn redirect_handler(
    path: web::Path<String>,
    service: web::Data<ShortenerService>,
) -> Result<impl Responder> {
    let code = path.into_inner();
    debug!("Redirect requested for code: {}", code);

    let url = service.resolve(&code).await?;

    info!("Redirecting '{}' to '{}'", code, url);
    Ok(HttpResponse::MovedPermanently()
        .insert_header((LOCATION, url))
        .finish())
}

/// The address quotas are charged to
fn client_ip(req: &HttpRequest, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(ip) = req.connection_info().realip_remote_addr() {
            return ip.to_string();
        }
    }

    match req.peer_addr() {
        Some(addr) => addr.ip().to_string(),
        None => {
            warn!("No peer address for request; charging the shared 'unknown' quota");
            "unknown".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test as actix_test;

    use super::*;

    #[test]
    fn test_client_ip_prefers_peer_address() {
        let req = actix_test::TestRequest::default()
            .peer_addr("203.0.113.7:40000".parse().unwrap())
            .insert_header(("x-forwarded-for", "198.51.100.1"))
            .to_http_request();

        assert_eq!(client_ip(&req, false), "203.0.113.7");
        assert_eq!(client_ip(&req, true), "198.51.100.1");
    }

    #[test]
    fn test_client_ip_without_peer_falls_back_to_shared_key() {
        let req = actix_test::TestRequest::default().to_http_request();
        assert_eq!(client_ip(&req, false), "unknown");
    }
}
