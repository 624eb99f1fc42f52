//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the catalog service over a repository
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `decode.rs`: path, query and body decoding
//! - `dto.rs`: wire schemas and mapping to/from domain types
//! - `errors.rs`: category → status mapping and error bodies

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use catalog_infra::CatalogRepository;

use crate::middleware;

pub mod decode;
pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub const API_PREFIX: &str = "/api/v1";

/// Build the full HTTP router over `repo` (used by `main.rs` and the tests).
pub fn build_app(repo: Arc<dyn CatalogRepository>) -> Router {
    let services = Arc::new(services::AppServices::new(repo));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest(API_PREFIX, routes::router())
        .fallback(routes::system::not_found)
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::request_log_middleware)),
        )
}
