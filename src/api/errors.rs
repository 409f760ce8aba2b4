use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::search::SearchError;

/// Error body returned to HTTP callers: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: &self.detail })).into_response()
    }
}

pub(super) fn search_to_api_error(e: SearchError) -> ApiError {
    let status = match &e {
        SearchError::InvalidQuery | SearchError::InvalidThreshold(_) => StatusCode::BAD_REQUEST,
        SearchError::Embedding(_) | SearchError::Internal(_) => {
            error!(error = %e, "search failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    ApiError {
        status,
        detail: e.to_string(),
    }
}
