//! Classification capability
//!
//! [`RuleClassifier`] runs the local rule set. [`RemoteClassifier`] posts the
//! report to a hosted model and falls back to the rules whenever the remote
//! call does not produce a usable result.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::features::FeatureExtractor;
use super::rules::{classify, ClassificationResult};
use crate::config::ClassifierConfig;

#[async_trait]
pub trait RiskClassifier: Send + Sync {
    async fn classify(&self, report: &Value) -> ClassificationResult;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Local, synchronous rule set.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleClassifier {
    extractor: FeatureExtractor,
}

impl RuleClassifier {
    pub fn new() -> Self {
        Self { extractor: FeatureExtractor::new() }
    }

    pub fn classify_report(&self, report: &Value) -> ClassificationResult {
        classify(&self.extractor.extract(report))
    }
}

#[async_trait]
impl RiskClassifier for RuleClassifier {
    async fn classify(&self, report: &Value) -> ClassificationResult {
        self.classify_report(report)
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}

#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    version: &'a str,
    input: PredictionInput,
}

#[derive(Debug, Serialize)]
struct PredictionInput {
    /// The model expects the report as a JSON encoded string
    token_data: String,
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    output: Option<ClassificationResult>,
}

/// Hosted model client
pub struct RemoteClassifier {
    client: Client,
    endpoint: String,
    api_token: String,
    model_version: String,
    fallback: RuleClassifier,
}

impl RemoteClassifier {
    pub fn new(
        endpoint: impl Into<String>,
        api_token: impl Into<String>,
        model_version: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            endpoint: endpoint.into(),
            api_token: api_token.into(),
            model_version: model_version.into(),
            fallback: RuleClassifier::new(),
        }
    }

    async fn request(&self, report: &Value) -> Result<ClassificationResult, String> {
        let body = PredictionRequest {
            version: &self.model_version,
            input: PredictionInput { token_data: report.to_string() },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("status {}", response.status().as_u16()));
        }

        let parsed: PredictionResponse =
            response.json().await.map_err(|e| format!("malformed body: {}", e))?;
        let output = parsed.output.ok_or_else(|| "response has no output".to_string())?;
        if !(0.0..=1.0).contains(&output.fraud_probability) {
            return Err(format!("fraud_probability {} out of range", output.fraud_probability));
        }
        // derive label and confidence locally from the probability
        Ok(ClassificationResult::from_probability(output.fraud_probability))
    }
}

#[async_trait]
impl RiskClassifier for RemoteClassifier {
    async fn classify(&self, report: &Value) -> ClassificationResult {
        match self.request(report).await {
            Ok(result) => {
                debug!(fraud_probability = result.fraud_probability, "remote classification");
                result
            }
            Err(reason) => {
                warn!(%reason, "remote classifier failed, falling back to rules");
                self.fallback.classify_report(report)
            }
        }
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

/// Remote model when an API token is configured, rules otherwise.
pub fn select_classifier(config: &ClassifierConfig, timeout: Duration) -> Arc<dyn RiskClassifier> {
    match config.api_token.as_deref().filter(|_| config.remote_enabled()) {
        Some(token) => Arc::new(RemoteClassifier::new(
            config.endpoint.clone(),
            token,
            config.model_version.clone(),
            timeout,
        )),
        None => Arc::new(RuleClassifier::new()),
    }
}
