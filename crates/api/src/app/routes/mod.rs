use axum::Router;

pub mod packets;
pub mod products;
pub mod system;

/// Router for the versioned catalog endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/packets", packets::router())
}
