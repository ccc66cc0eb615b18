use std::sync::Arc;

use actix_web::middleware::{Compress, Logger};
use actix_web::{App, HttpServer, dev::Server, error::Error, web};
use storefront_common::StorefrontError;

use crate::api;
use crate::error::AppError;
use crate::middleware::{auth::Authentication, rate_limit::RateLimiter};
use crate::model::AppState;

/// Largest accepted JSON body
const JSON_LIMIT: usize = 1024 * 1024;

fn bad_request(message: String) -> Error {
    AppError::from(StorefrontError::IllegalArgument(message)).into()
}

/// Malformed JSON bodies answer with the usual 400 error body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req| bad_request(err.to_string()))
}

/// Malformed query strings answer with the usual 400 error body.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| bad_request(err.to_string()))
}

/// Malformed path segments, e.g. a non-numeric id, answer with a 400.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| bad_request(err.to_string()))
}

/// Creates and binds the storefront HTTP server.
pub fn storefront_server(
    app_state: Arc<AppState>,
    login_limiter: RateLimiter,
    context_path: String,
    address: String,
    port: u16,
) -> Result<Server, std::io::Error> {
    tracing::info!(address = %address, port, context_path = %context_path, "Starting HTTP server");

    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Compress::default())
            .wrap(Authentication)
            .app_data(web::Data::from(app_state.clone()))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .service(web::scope(&context_path).service(api::routes(login_limiter.clone())))
    })
    .bind((address, port))?
    .run())
}
