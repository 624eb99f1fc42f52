//! Request decoding: path ids, query parameters and JSON bodies.
//!
//! Every failure here is a `Validation` error, raised before the service is
//! called.

use std::collections::HashMap;
use std::str::FromStr;

use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use catalog_core::{CatalogError, CatalogResult};

use crate::app::errors::ApiError;

/// Typed `{id}` path segment.
///
/// Both axum's own path rejections (such as invalid UTF-8 after
/// percent-decoding) and non-numeric ids become `Validation` errors with the
/// usual JSON body.
#[derive(Debug, Clone, Copy)]
pub struct IdPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for IdPath<T>
where
    S: Send + Sync,
    T: FromStr<Err = CatalogError> + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                CatalogError::validation(format!("invalid path: {}", rejection.body_text()))
                    .with_context("param", "id")
                    .with_source(rejection)
            })?;
        Ok(Self(path_id(&raw)?))
    }
}

/// Parse a path segment as a typed id.
pub fn path_id<T>(raw: &str) -> CatalogResult<T>
where
    T: FromStr<Err = CatalogError>,
{
    raw.parse()
}

/// A required integer query parameter.
pub fn required_i64(query: &HashMap<String, String>, name: &str) -> CatalogResult<i64> {
    match query.get(name) {
        Some(raw) => parse_i64(name, raw),
        None => Err(CatalogError::validation(format!("missing query parameter {name}"))
            .with_context("param", name)),
    }
}

/// An optional integer query parameter; present but malformed is an error.
pub fn optional_i64(query: &HashMap<String, String>, name: &str) -> CatalogResult<Option<i64>> {
    query.get(name).map(|raw| parse_i64(name, raw)).transpose()
}

fn parse_i64(name: &str, raw: &str) -> CatalogResult<i64> {
    raw.parse::<i64>().map_err(|e| {
        CatalogError::validation(format!("invalid query parameter {name}: {raw:?}"))
            .with_context("param", name)
            .with_source(e)
    })
}

/// Decode a JSON request body. Absent, empty and malformed bodies are all
/// rejected.
pub fn json_body<T: DeserializeOwned>(body: &[u8]) -> CatalogResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(CatalogError::validation("request body is required"));
    }
    serde_json::from_slice(body).map_err(|e| {
        CatalogError::validation(format!("invalid request body: {e}")).with_source(e)
    })
}
