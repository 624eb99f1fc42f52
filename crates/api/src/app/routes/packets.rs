use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Query},
    routing::get,
    Json, Router,
};

use catalog_core::PackageId;
use catalog_products::Package;

use crate::app::decode::{self, IdPath};
use crate::app::dto::{
    EmptyResponse, PackageSchema, PacketIdResponse, PacketRequest, PacketResponse, PacketsResponse,
};
use crate::app::errors::ApiError;
use crate::app::routes::system;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route(
            "/",
            get(list_packets)
                .post(create_packet)
                .fallback(system::method_not_allowed),
        )
        .route(
            "/search",
            get(search_packets).fallback(system::method_not_allowed),
        )
        .route(
            "/:id",
            get(get_packet)
                .delete(delete_packet)
                .fallback(system::method_not_allowed),
        )
}

fn packets(items: Vec<Package>) -> Json<PacketsResponse> {
    Json(PacketsResponse {
        packets: items.into_iter().map(PackageSchema::from).collect(),
    })
}

pub async fn search_packets(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<PacketsResponse>, ApiError> {
    let limit = decode::required_i64(&query, "limit")?;
    let offset = decode::required_i64(&query, "offset")?;
    let text = query.get("query").map(String::as_str).unwrap_or_default();

    let found = services.catalog.search_packages(text, limit, offset).await?;
    Ok(packets(found))
}

pub async fn list_packets(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<PacketsResponse>, ApiError> {
    let limit = decode::required_i64(&query, "limit")?;
    let offset = decode::required_i64(&query, "offset")?;

    let listed = services.catalog.list_packages(limit, offset).await?;
    Ok(packets(listed))
}

pub async fn create_packet(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> Result<Json<PacketIdResponse>, ApiError> {
    let req: PacketRequest = decode::json_body(&body)?;

    let mut package = Package {
        id: PackageId::default(),
        ..Package::from(req.packet)
    };
    let id = services.catalog.create_package(&mut package).await?;

    Ok(Json(PacketIdResponse { packet_id: id.get() }))
}

pub async fn get_packet(
    Extension(services): Extension<Arc<AppServices>>,
    IdPath(id): IdPath<PackageId>,
) -> Result<Json<PacketResponse>, ApiError> {
    let package = services.catalog.get_package_by_id(id).await?;
    Ok(Json(PacketResponse {
        packet: package.into(),
    }))
}

pub async fn delete_packet(
    Extension(services): Extension<Arc<AppServices>>,
    IdPath(id): IdPath<PackageId>,
) -> Result<Json<EmptyResponse>, ApiError> {
    services.catalog.delete_package(id).await?;
    Ok(Json(EmptyResponse {}))
}
