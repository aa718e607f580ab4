//! Cache views: `/api/tokens`, `/api/stats`, and the 404 fallback

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error};

use crate::api::server::AppState;
use crate::api::types::{ErrorResponse, PageQuery};
use crate::core::errors::RiskError;

pub async fn list_tokens(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Response {
    let (page, per_page) = (query.page(), query.per_page());
    debug!(page, per_page, "list tokens");

    match state.service.list_tokens(page, per_page).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => {
            error!(error = %e, "listing failed");
            ErrorResponse::new(e.to_string(), "Failed to retrieve tokens")
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn get_stats(State(state): State<AppState>) -> Response {
    match state.service.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            error!(error = %e, "stats failed");
            ErrorResponse::new(e.to_string(), "Failed to retrieve statistics")
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn not_found() -> Response {
    RiskError::NotFound.into_response()
}
