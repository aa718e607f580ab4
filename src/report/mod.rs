//! Risk report model, normalization and upstream source.

pub mod normalizer;
pub mod source;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

pub use normalizer::{anomalies, NormalizedReport, ReportNormalizer};
pub use source::{ReportSource, RugCheckClient};

/// Coarse verdict derived from the upstream score and the fraud threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Safe,
    Fraud,
}

impl RiskLevel {
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score >= threshold {
            Self::Fraud
        } else {
            Self::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::Fraud => "Fraud",
        }
    }

    /// Unknown values read back from storage are treated as `Safe`.
    pub fn parse_lenient(s: &str) -> Self {
        if s == "Fraud" {
            Self::Fraud
        } else {
            Self::Safe
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenReport {
    pub token_id: String,
    pub name: String,
    pub symbol: String,
    pub score_normalised: f64,
    pub risk_level: RiskLevel,
    pub price: f64,
    pub holders: i64,
    pub liquidity: f64,
    pub market_cap: f64,
    pub creator_holdings_pct: f64,
    pub detected_at: String,
    #[serde(serialize_with = "rfc3339_millis")]
    pub fetched_at: DateTime<Utc>,
    pub raw_json: Value,
}

/// A listing row: the report without its raw payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenSummary {
    pub id: i64,
    pub token_id: String,
    pub name: String,
    pub symbol: String,
    pub risk_level: RiskLevel,
    pub score_normalised: f64,
    pub price: f64,
    pub market_cap: f64,
    pub liquidity: f64,
    pub holders: i64,
    pub creator_holdings_pct: f64,
    pub detected_at: String,
    #[serde(serialize_with = "rfc3339_millis")]
    pub fetched_at: DateTime<Utc>,
}

/// `2025-01-01T00:00:00.000Z`
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn rfc3339_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(ts))
}
