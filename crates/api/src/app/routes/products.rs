use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Query},
    routing::get,
    Json, Router,
};

use catalog_core::{CatalogError, ProductId};
use catalog_products::Product;

use crate::app::decode::{self, IdPath};
use crate::app::dto::{
    EmptyResponse, ProductIdResponse, ProductRequest, ProductResponse, ProductSchema,
    ProductsResponse,
};
use crate::app::errors::ApiError;
use crate::app::routes::system;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route(
            "/",
            get(list_products)
                .post(create_product)
                .fallback(system::method_not_allowed),
        )
        .route(
            "/:id",
            get(get_product)
                .put(update_product)
                .delete(delete_product)
                .fallback(system::method_not_allowed),
        )
}

/// `limit`/`offset` are optional here; without them every product is returned.
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let limit = decode::optional_i64(&query, "limit")?;
    let offset = decode::optional_i64(&query, "offset")?;

    let products = match (limit, offset) {
        (None, None) => services.catalog.get_every_product().await?,
        (limit, offset) => {
            services
                .catalog
                .get_all_products(limit.unwrap_or(i64::MAX), offset.unwrap_or(0))
                .await?
        }
    };

    Ok(Json(ProductsResponse {
        products: products.into_iter().map(ProductSchema::from).collect(),
    }))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    IdPath(id): IdPath<ProductId>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = services.catalog.get_product_by_id(id).await?;
    Ok(Json(ProductResponse {
        product: product.into(),
    }))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> Result<Json<ProductIdResponse>, ApiError> {
    let req: ProductRequest = decode::json_body(&body)?;

    // Ids are server-assigned.
    let mut product = Product {
        id: ProductId::default(),
        ..Product::from(req.product)
    };
    let id = services.catalog.create_product(&mut product).await?;

    Ok(Json(ProductIdResponse {
        product_id: id.get(),
    }))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    IdPath(id): IdPath<ProductId>,
    body: Bytes,
) -> Result<Json<EmptyResponse>, ApiError> {
    let req: ProductRequest = decode::json_body(&body)?;

    if req.product.id != 0 && req.product.id != id.get() {
        return Err(CatalogError::validation(format!(
            "body id {} does not match path id {id}",
            req.product.id
        ))
        .with_context("param", "id")
        .into());
    }

    let product = Product {
        id,
        ..Product::from(req.product)
    };
    services.catalog.update_product(&product).await?;
    Ok(Json(EmptyResponse {}))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    IdPath(id): IdPath<ProductId>,
) -> Result<Json<EmptyResponse>, ApiError> {
    services.catalog.delete_product(id).await?;
    Ok(Json(EmptyResponse {}))
}
