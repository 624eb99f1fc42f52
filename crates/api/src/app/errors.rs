use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use catalog_core::{CatalogError, ErrorKind, kind_of};

pub const INTERNAL_MESSAGE: &str = "internal server error";

/// Status code for an error, decided by its category alone.
///
/// Errors that carry no [`CatalogError`] anywhere in their chain are treated
/// as internal.
pub fn status_for(err: &(dyn StdError + 'static)) -> StatusCode {
    match kind_of(err) {
        Some(ErrorKind::NotFound) => StatusCode::NOT_FOUND,
        Some(ErrorKind::Validation) => StatusCode::BAD_REQUEST,
        Some(ErrorKind::Duplicate | ErrorKind::Conflict) => StatusCode::CONFLICT,
        Some(ErrorKind::Unauthorized) => StatusCode::UNAUTHORIZED,
        Some(ErrorKind::Forbidden) => StatusCode::FORBIDDEN,
        Some(ErrorKind::Internal | ErrorKind::Unknown) | None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

/// Handler error: a catalog error on its way to becoming a response.
#[derive(Debug)]
pub struct ApiError(pub CatalogError);

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_for(&err);

        if status.is_server_error() {
            error!(
                kind = %err.kind(),
                context = ?err.context(),
                error = %err.chain(),
                "request failed"
            );
            json_error(status, INTERNAL_MESSAGE)
        } else {
            warn!(
                kind = %err.kind(),
                context = ?err.context(),
                error = %err.chain(),
                "request rejected"
            );
            json_error(status, err.message())
        }
    }
}
