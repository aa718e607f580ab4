//! Upstream risk report source (RugCheck API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use crate::config::ReportSourceConfig;
use crate::core::errors::{Result, RiskError};

#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch the raw report for `token_id`.
    async fn fetch_report(&self, token_id: &str) -> Result<Value>;
}

/// RugCheck API client
#[derive(Debug, Clone)]
pub struct RugCheckClient {
    client: Client,
    base_url: String,
}

impl RugCheckClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    pub fn from_config(config: &ReportSourceConfig) -> Self {
        Self::new(config.base_url.clone(), config.timeout())
    }

    /// `{base}/tokens/{token_id}/report` with the token ID encoded as a single
    /// path segment.
    pub fn report_url(&self, token_id: &str) -> Result<Url> {
        if matches!(token_id, "." | "..") {
            return Err(RiskError::Validation(format!("Invalid token ID: {}", token_id)));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| RiskError::Internal(format!("invalid report source URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| RiskError::Internal("report source URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["tokens", token_id, "report"]);
        Ok(url)
    }
}

#[async_trait]
impl ReportSource for RugCheckClient {
    async fn fetch_report(&self, token_id: &str) -> Result<Value> {
        let url = self.report_url(token_id)?;
        debug!(%url, "fetching risk report");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RiskError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RiskError::Upstream { status: status.as_u16() });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RiskError::Internal(format!("invalid report body: {}", e)))
    }
}
