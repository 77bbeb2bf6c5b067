use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::repository::{QuoteReference, QuoteRepository, RepositoryError};
use super::service::{QuoteRequest, QuoteService, QuoteServiceError};

/// Router builder exposing HTTP endpoints for quote passes and retrieval.
pub fn quote_router<R>(service: Arc<QuoteService<R>>) -> Router
where
    R: QuoteRepository + 'static,
{
    Router::new()
        .route("/api/v1/quotes/btl", post(btl_handler::<R>))
        .route("/api/v1/quotes/bridging", post(bridging_handler::<R>))
        .route("/api/v1/quotes/:reference", get(get_handler::<R>))
        .with_state(service)
}

pub(crate) async fn btl_handler<R>(
    State(service): State<Arc<QuoteService<R>>>,
    axum::Json(request): axum::Json<QuoteRequest>,
) -> Response
where
    R: QuoteRepository + 'static,
{
    match service.quote_btl(request) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn bridging_handler<R>(
    State(service): State<Arc<QuoteService<R>>>,
    axum::Json(request): axum::Json<QuoteRequest>,
) -> Response
where
    R: QuoteRepository + 'static,
{
    match service.quote_bridging(request) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<QuoteService<R>>>,
    Path(reference): Path<String>,
) -> Response
where
    R: QuoteRepository + 'static,
{
    let reference = QuoteReference(reference);
    match service.get(&reference) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: QuoteServiceError) -> Response {
    let status = match &error {
        QuoteServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        QuoteServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        QuoteServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
