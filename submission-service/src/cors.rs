//! CORS policy for the browser front-end.

use actix_cors::Cors;
use actix_web::http::{header, Method};

/// Any origin when `allowed_origins` is empty, otherwise only the listed ones.
pub fn build_cors(allowed_origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allowed_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600);

    if allowed_origins.is_empty() {
        return cors.allow_any_origin();
    }

    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}
