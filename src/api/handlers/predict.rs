//! Per-token endpoints: `/predict/:token_id` and `/detect/:token_id`

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info};

use crate::api::server::AppState;
use crate::api::types::{status_for, ErrorResponse, PredictQuery};
use crate::core::errors::RiskError;

pub async fn predict_token(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
    Query(query): Query<PredictQuery>,
) -> Response {
    let force_refresh = query.force_refresh();
    info!(%token_id, force_refresh, "predict request");

    match state.service.predict(&token_id, force_refresh).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => token_error(&token_id, e),
    }
}

pub async fn detect_token(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> Response {
    info!(%token_id, "detect request");

    match state.service.detect(&token_id).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => token_error(&token_id, e),
    }
}

/// `/predict/` and `/detect/` without an id
pub async fn missing_token_id() -> Response {
    RiskError::Validation("Token ID is required".to_string()).into_response()
}

fn token_error(token_id: &str, err: RiskError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(%token_id, error = %err, "token request failed");
    } else {
        info!(%token_id, error = %err, status = status.as_u16(), "token request rejected");
    }
    ErrorResponse::from_error(&err).with_token(token_id).into_response_with(status)
}
