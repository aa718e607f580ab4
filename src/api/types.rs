use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::core::errors::RiskError;

/// Error body shared by every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `"error"`
    pub status: String,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self { status: "error".to_string(), error: error.into(), message: message.into(), token_id: None }
    }

    pub fn with_token(mut self, token_id: impl Into<String>) -> Self {
        self.token_id = Some(token_id.into());
        self
    }

    pub fn from_error(err: &RiskError) -> Self {
        Self::new(err.to_string(), err.user_message())
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Upstream statuses outside the valid HTTP range become 500.
pub fn status_for(err: &RiskError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for RiskError {
    fn into_response(self) -> Response {
        ErrorResponse::from_error(&self).into_response_with(status_for(&self))
    }
}

/// `page` / `per_page` query parameters, kept as raw strings so bad input
/// falls back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        positive_or(self.page.as_deref(), 1)
    }

    pub fn per_page(&self) -> u32 {
        positive_or(self.per_page.as_deref(), crate::storage::DEFAULT_PER_PAGE)
            .min(crate::storage::MAX_PER_PAGE)
    }
}

fn positive_or(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok()).filter(|v| *v > 0).unwrap_or(default)
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictQuery {
    pub force_refresh: Option<String>,
}

impl PredictQuery {
    /// Only the literal `true` forces a refresh.
    pub fn force_refresh(&self) -> bool {
        self.force_refresh.as_deref() == Some("true")
    }
}
