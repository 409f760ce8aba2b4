mod errors;
mod params;

pub use errors::ApiError;
pub use params::{SearchParams, SearchResponse, StatusResponse};

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use errors::search_to_api_error;

use crate::embed::Embedder;
use crate::repository::RepositoryClient;
use crate::search::SearchEngine;

/// HTTP surface of the search service.
///
/// - `GET /`: liveness message
/// - `POST /search`: `{query, threshold?}` → `{results: [...]}`
pub fn router<E: Embedder, C: RepositoryClient>(
    engine: Arc<SearchEngine<E, C>>,
    cors_origins: &[String],
) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/search", post(search::<E, C>))
        .with_state(engine)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// `*` allows any origin without credentials. An explicit list allows
/// credentials and mirrors the preflight's requested method and headers.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|e| warn!(%origin, error = %e, "ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "Legal Search API is running",
    })
}

async fn search<E: Embedder, C: RepositoryClient>(
    State(engine): State<Arc<SearchEngine<E, C>>>,
    Json(params): Json<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let threshold = params.threshold();
    info!(query_len = params.query.len(), threshold, "POST /search");

    let results = engine
        .search(&params.query, threshold)
        .await
        .map_err(search_to_api_error)?;

    Ok(Json(SearchResponse { results }))
}
