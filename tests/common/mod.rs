//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use token_risk_detector::api::RiskServer;
use token_risk_detector::core::{Clock, ManualClock};
use token_risk_detector::detection::{RiskClassifier, RuleClassifier};
use token_risk_detector::report::{RugCheckClient, TokenReport};
use token_risk_detector::service::{RiskService, ServiceSettings};
use token_risk_detector::storage::{CacheStats, Page, ReportStore, SqliteReportStore};
use token_risk_detector::{Result, RiskError};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub async fn memory_store(clock: Arc<ManualClock>) -> Arc<SqliteReportStore> {
    Arc::new(SqliteReportStore::new_with_url("sqlite::memory:", 1, clock).await.unwrap())
}

/// Service wired to a RugCheck client at `upstream` and the rule classifier.
pub fn build_service(
    upstream: &str,
    store: Arc<dyn ReportStore>,
    clock: Arc<dyn Clock>,
) -> Arc<RiskService> {
    build_service_with(upstream, store, clock, Arc::new(RuleClassifier::new()))
}

pub fn build_service_with(
    upstream: &str,
    store: Arc<dyn ReportStore>,
    clock: Arc<dyn Clock>,
    classifier: Arc<dyn RiskClassifier>,
) -> Arc<RiskService> {
    let source = Arc::new(RugCheckClient::new(upstream, Duration::from_secs(5)));
    Arc::new(RiskService::new(store, source, classifier, clock, ServiceSettings::default()))
}

pub fn test_server(service: Arc<RiskService>) -> TestServer {
    let server = RiskServer::with_service(service, "127.0.0.1".to_string(), 0);
    TestServer::new(server.create_router()).unwrap()
}

/// The fraud scenario: score 70, thin liquidity, few holders, creator holds 90%.
pub fn fraud_report() -> Value {
    json!({
        "tokenMeta": { "name": "Rug Token", "symbol": "RUG" },
        "score_normalised": 70,
        "totalMarketLiquidity": 500,
        "totalHolders": 10,
        "creatorBalance": 900,
        "token": { "supply": 1000, "decimals": 6 },
        "price": 0.25,
        "detectedAt": "2025-05-30T08:00:00Z",
        "risks": [
            { "name": "Low Liquidity", "description": "Low amount of liquidity", "value": "$500" }
        ]
    })
}

pub fn safe_report() -> Value {
    json!({
        "tokenMeta": { "name": "Good Token", "symbol": "GOOD" },
        "score_normalised": 5,
        "totalMarketLiquidity": 250000,
        "totalHolders": 12000,
        "creatorBalance": 0,
        "token": { "supply": 1000000000, "decimals": 6 },
        "price": 1.0,
        "topHolders": [{ "pct": 4.2 }]
    })
}

/// Store whose every operation fails.
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl ReportStore for FailingStore {
    async fn get_fresh(&self, _token_id: &str, _ttl: chrono::Duration) -> Result<Option<TokenReport>> {
        Err(RiskError::Storage("database is locked".into()))
    }

    async fn put(&self, _report: &TokenReport) -> Result<i64> {
        Err(RiskError::Persistence("disk I/O error".into()))
    }

    async fn list(&self, _page: u32, _per_page: u32) -> Result<Page> {
        Err(RiskError::Storage("no such table: token_reports".into()))
    }

    async fn stats(&self) -> Result<CacheStats> {
        Err(RiskError::Storage("no such table: token_reports".into()))
    }
}
