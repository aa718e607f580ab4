use std::sync::Arc;

use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    middleware,
    response::Response,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::{limit::ConcurrencyLimitLayer, timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::api::middleware::cors_middleware;
use crate::api::server_config::*;
use crate::api::types::ErrorResponse;
use crate::config::AppConfig;
use crate::core::clock::{Clock, SystemClock};
use crate::service::RiskService;
use crate::storage::SqliteReportStore;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RiskService>,
}

#[derive(Clone)]
pub struct RiskServer {
    pub service: Arc<RiskService>,
    pub host: String,
    pub port: u16,
}

impl RiskServer {
    /// Open the report store and wire the service from configuration.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = SqliteReportStore::new_with_url(
            &config.storage.database_url,
            config.storage.max_connections,
            clock.clone(),
        )
        .await?;
        let service = RiskService::from_config(config, Arc::new(store), clock);
        Ok(Self::with_service(Arc::new(service), config.server.host.clone(), config.server.port))
    }

    /// Used by tests to inject a service built from fakes.
    pub fn with_service(service: Arc<RiskService>, host: String, port: u16) -> Self {
        Self { service, host, port }
    }

    pub fn create_router(self) -> Router {
        let state = AppState { service: self.service };

        Router::new()
            .route("/predict", get(handlers::missing_token_id))
            .route("/predict/", get(handlers::missing_token_id))
            .route("/predict/:token_id", get(handlers::predict_token))
            .route("/detect", get(handlers::missing_token_id))
            .route("/detect/", get(handlers::missing_token_id))
            .route("/detect/:token_id", get(handlers::detect_token))
            .route("/api/tokens", get(handlers::list_tokens))
            .route("/api/stats", get(handlers::get_stats))
            .route("/health", get(handlers::health_check))
            .route("/api/health", get(handlers::health_check))
            .fallback(handlers::not_found)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(middleware_error))
                    .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENCY))
                    .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                    .layer(TraceLayer::new_for_http()),
            )
            // outermost so timeouts and 404s get CORS headers too
            .layer(middleware::from_fn(cors_middleware))
    }

    pub async fn start(self) -> Result<(), anyhow::Error> {
        let addr = format!("{}:{}", self.host, self.port);
        let app = self.create_router();
        tracing::info!("Server listening on {}", addr);
        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

/// Timeout and overload errors from the tower stack, in the shared error body.
async fn middleware_error(err: BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        ErrorResponse::new("Request Timeout", "Request timed out")
            .into_response_with(StatusCode::REQUEST_TIMEOUT)
    } else {
        tracing::warn!(error = %err, "request rejected by middleware");
        ErrorResponse::new("Service Unavailable", "Service overloaded, please retry")
            .into_response_with(StatusCode::SERVICE_UNAVAILABLE)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(response: Response) -> ErrorResponse {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_timeout_is_json_408() {
        let response = middleware_error(Box::new(tower::timeout::error::Elapsed::new())).await;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let body = body_of(response).await;
        assert_eq!(body.status, "error");
        assert_eq!(body.error, "Request Timeout");
        assert_eq!(body.message, "Request timed out");
    }

    #[tokio::test]
    async fn test_other_middleware_error_is_json_503() {
        let response = middleware_error("service overloaded".into()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_of(response).await;
        assert_eq!(body.status, "error");
        assert_eq!(body.error, "Service Unavailable");
        assert!(body.token_id.is_none());
    }
}
