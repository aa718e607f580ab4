//! Fetch, score and cache pipeline behind the HTTP handlers.

use std::sync::Arc;

use chrono::{DateTime, DurationRound, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::core::clock::Clock;
use crate::core::errors::{Result, RiskError};
use crate::detection::{select_classifier, ClassificationResult, RiskClassifier, RuleClassifier};
use crate::report::{
    anomalies, format_timestamp, ReportNormalizer, ReportSource, RiskLevel, RugCheckClient,
    TokenReport,
};
use crate::storage::{round1, CacheStats, Page, ReportStore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceSettings {
    pub ttl: chrono::Duration,
    pub fraud_threshold: f64,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self { ttl: config.cache.ttl(), fraud_threshold: config.detection.fraud_threshold }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Outcome of the cache check.
#[derive(Debug)]
pub enum CacheLookup {
    Hit(TokenReport),
    Miss,
}

/// Body of a successful `/predict` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionView {
    pub token_id: String,
    pub status: &'static str,
    pub name: String,
    pub symbol: String,
    pub risk_level: RiskLevel,
    pub market_cap: f64,
    pub liquidity: f64,
    pub holders: i64,
    pub creation_date: String,
    pub price: f64,
    pub ml_prediction: Option<ClassificationResult>,
    pub raw_data: Value,
    pub cached: bool,
    pub fetched_at: String,
    pub cache_age_hours: f64,
}

impl PredictionView {
    fn from_report(
        report: TokenReport,
        ml_prediction: ClassificationResult,
        cached: bool,
        cache_age_hours: f64,
    ) -> Self {
        Self {
            status: "success",
            fetched_at: format_timestamp(&report.fetched_at),
            token_id: report.token_id,
            name: report.name,
            symbol: report.symbol,
            risk_level: report.risk_level,
            market_cap: report.market_cap,
            liquidity: report.liquidity,
            holders: report.holders,
            creation_date: report.detected_at,
            price: report.price,
            ml_prediction: Some(ml_prediction),
            raw_data: report.raw_json,
            cached,
            cache_age_hours,
        }
    }
}

/// Body of a `/detect` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionView {
    pub token_id: String,
    pub status: &'static str,
    pub name: String,
    pub symbol: String,
    pub score_normalised: f64,
    pub risk_level: RiskLevel,
    pub market_cap: f64,
    pub liquidity: f64,
    pub holders: i64,
    pub creation_date: String,
    pub creator_holdings: f64,
    pub anomalies: Vec<String>,
    pub price: f64,
    pub raw_data: Value,
}

/// Risk pipeline
pub struct RiskService {
    store: Arc<dyn ReportStore>,
    source: Arc<dyn ReportSource>,
    classifier: Arc<dyn RiskClassifier>,
    rules: RuleClassifier,
    normalizer: ReportNormalizer,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
}

impl RiskService {
    pub fn new(
        store: Arc<dyn ReportStore>,
        source: Arc<dyn ReportSource>,
        classifier: Arc<dyn RiskClassifier>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            source,
            classifier,
            rules: RuleClassifier::new(),
            normalizer: ReportNormalizer::new(settings.fraud_threshold),
            clock,
            ttl: settings.ttl,
        }
    }

    /// Wire the RugCheck client and the configured classifier around `store`.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn ReportStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let source = Arc::new(RugCheckClient::from_config(&config.report_source));
        let classifier = select_classifier(&config.classifier, config.report_source.timeout());
        info!(classifier = classifier.name(), "risk service configured");
        Self::new(store, source, classifier, clock, ServiceSettings::from_config(config))
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Cached prediction for `token_id`, refetching when stale, missing or forced.
    pub async fn predict(&self, token_id: &str, force_refresh: bool) -> Result<PredictionView> {
        let token_id = validate_token_id(token_id)?;

        if !force_refresh {
            if let CacheLookup::Hit(report) = self.lookup(token_id).await {
                let age = self.age_hours(report.fetched_at);
                info!(%token_id, cache_age_hours = age, "serving cached report");
                let prediction = self.rules.classify_report(&report.raw_json);
                return Ok(PredictionView::from_report(report, prediction, true, age));
            }
        }

        let raw = self.source.fetch_report(token_id).await?;
        let prediction = self.classifier.classify(&raw).await;

        let fetched_at = truncate_millis(self.clock.now());
        let report = self.normalizer.normalize(token_id, raw).stamp(fetched_at);

        if let Err(e) = self.store.put(&report).await {
            warn!(%token_id, error = %e, "failed to cache token report");
        }

        info!(%token_id, risk_level = %report.risk_level, "fresh report");
        Ok(PredictionView::from_report(report, prediction, false, 0.0))
    }

    /// Uncached detection: fetch and normalize, list anomalies, persist nothing.
    pub async fn detect(&self, token_id: &str) -> Result<DetectionView> {
        let token_id = validate_token_id(token_id)?;
        let raw = self.source.fetch_report(token_id).await?;
        let anomalies = anomalies(&raw);
        let report = self.normalizer.normalize(token_id, raw);

        Ok(DetectionView {
            token_id: report.token_id,
            status: "success",
            name: report.name,
            symbol: report.symbol,
            score_normalised: report.score_normalised,
            risk_level: report.risk_level,
            market_cap: report.market_cap,
            liquidity: report.liquidity,
            holders: report.holders,
            creation_date: report.detected_at,
            creator_holdings: report.creator_holdings_pct,
            anomalies,
            price: report.price,
            raw_data: report.raw_json,
        })
    }

    pub async fn list_tokens(&self, page: u32, per_page: u32) -> Result<Page> {
        self.store.list(page, per_page).await
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        self.store.stats().await
    }

    /// Read failures are logged and count as a miss.
    pub async fn lookup(&self, token_id: &str) -> CacheLookup {
        match self.store.get_fresh(token_id, self.ttl).await {
            Ok(Some(report)) => CacheLookup::Hit(report),
            Ok(None) => CacheLookup::Miss,
            Err(e) => {
                warn!(%token_id, error = %e, "cache read failed, treating as miss");
                CacheLookup::Miss
            }
        }
    }

    fn age_hours(&self, fetched_at: DateTime<Utc>) -> f64 {
        let ms = (self.clock.now() - fetched_at).num_milliseconds().max(0);
        round1(ms as f64 / 3_600_000.0)
    }
}

fn validate_token_id(token_id: &str) -> Result<&str> {
    let trimmed = token_id.trim();
    if trimmed.is_empty() {
        debug!("rejecting empty token id");
        return Err(RiskError::Validation("Token ID is required".to_string()));
    }
    Ok(trimmed)
}

/// Storage keeps millisecond precision; stamp with the same.
fn truncate_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(chrono::Duration::milliseconds(1)).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<TokenReport>>,
    }

    #[async_trait]
    impl ReportStore for MemoryStore {
        async fn get_fresh(
            &self,
            token_id: &str,
            _ttl: chrono::Duration,
        ) -> Result<Option<TokenReport>> {
            Ok(self.rows.lock().iter().rev().find(|r| r.token_id == token_id).cloned())
        }

        async fn put(&self, report: &TokenReport) -> Result<i64> {
            let mut rows = self.rows.lock();
            rows.push(report.clone());
            Ok(rows.len() as i64)
        }

        async fn list(&self, _page: u32, _per_page: u32) -> Result<Page> {
            Err(RiskError::Storage("unsupported".into()))
        }

        async fn stats(&self) -> Result<CacheStats> {
            Err(RiskError::Storage("unsupported".into()))
        }
    }

    struct StaticSource {
        report: Value,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl ReportSource for StaticSource {
        async fn fetch_report(&self, _token_id: &str) -> Result<Value> {
            *self.calls.lock() += 1;
            Ok(self.report.clone())
        }
    }

    fn service(
        store: Arc<MemoryStore>,
        source: Arc<StaticSource>,
        clock: Arc<ManualClock>,
    ) -> RiskService {
        RiskService::new(
            store,
            source,
            Arc::new(RuleClassifier::new()),
            clock,
            ServiceSettings::default(),
        )
    }

    fn scenario() -> Value {
        json!({
            "score_normalised": 70,
            "totalMarketLiquidity": 500,
            "totalHolders": 10,
            "creatorBalance": 900,
            "token": { "supply": 1000 }
        })
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let store = Arc::new(MemoryStore::default());
        let source = Arc::new(StaticSource { report: scenario(), calls: Mutex::new(0) });
        let svc = service(store.clone(), source.clone(), clock.clone());

        let fresh = svc.predict("tok", false).await.unwrap();
        assert!(!fresh.cached);
        assert_eq!(fresh.cache_age_hours, 0.0);
        assert_eq!(fresh.risk_level, RiskLevel::Fraud);
        assert_eq!(fresh.fetched_at, "2025-01-01T00:00:00.000Z");
        assert_eq!(store.rows.lock().len(), 1);

        clock.advance(chrono::Duration::minutes(90));
        let cached = svc.predict("tok", false).await.unwrap();
        assert!(cached.cached);
        assert_eq!(cached.cache_age_hours, 1.5);
        assert_eq!(cached.ml_prediction, fresh.ml_prediction);
        assert_eq!(*source.calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_skips_cache() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(MemoryStore::default());
        let source = Arc::new(StaticSource { report: scenario(), calls: Mutex::new(0) });
        let svc = service(store.clone(), source.clone(), clock);

        svc.predict("tok", false).await.unwrap();
        let again = svc.predict("tok", true).await.unwrap();
        assert!(!again.cached);
        assert_eq!(*source.calls.lock(), 2);
        assert_eq!(store.rows.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_detect_is_uncached() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(MemoryStore::default());
        let source = Arc::new(StaticSource { report: scenario(), calls: Mutex::new(0) });
        let svc = service(store.clone(), source, clock);

        let view = svc.detect("tok").await.unwrap();
        assert_eq!(view.anomalies, vec!["No specific risks detected in API response"]);
        assert!((view.creator_holdings - 90.0).abs() < 1e-9);
        assert!(store.rows.lock().is_empty());
    }

    #[tokio::test]
    async fn test_blank_token_rejected() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let source = Arc::new(StaticSource { report: json!({}), calls: Mutex::new(0) });
        let svc = service(Arc::new(MemoryStore::default()), source.clone(), clock);

        let err = svc.predict("   ", false).await.unwrap_err();
        assert!(matches!(err, RiskError::Validation(_)));
        assert_eq!(*source.calls.lock(), 0);
    }

    #[test]
    fn test_truncate_millis() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        assert_eq!(truncate_millis(ts).timestamp_subsec_nanos(), 123_000_000);
    }
}
