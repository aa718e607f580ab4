//! Report normalizer
//!
//! Maps an upstream risk report onto the canonical [`TokenReport`] fields.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{RiskLevel, TokenReport};
use crate::core::ValueExt;
use crate::detection::DEFAULT_FRAUD_THRESHOLD;

const DEFAULT_NAME: &str = "Unknown Token";
const DEFAULT_SYMBOL: &str = "UNK";
const DEFAULT_SUPPLY: f64 = 1_000_000_000_000.0;
const DEFAULT_DECIMALS: f64 = 6.0;
const NO_RISKS: &str = "No specific risks detected in API response";

/// A report that has not been stamped with a fetch time yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReport {
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
    pub raw_json: Value,
}

impl NormalizedReport {
    pub fn stamp(self, fetched_at: DateTime<Utc>) -> TokenReport {
        TokenReport {
            token_id: self.token_id,
            name: self.name,
            symbol: self.symbol,
            score_normalised: self.score_normalised,
            risk_level: self.risk_level,
            price: self.price,
            holders: self.holders,
            liquidity: self.liquidity,
            market_cap: self.market_cap,
            creator_holdings_pct: self.creator_holdings_pct,
            detected_at: self.detected_at,
            fetched_at,
            raw_json: self.raw_json,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReportNormalizer {
    fraud_threshold: f64,
}

impl Default for ReportNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_FRAUD_THRESHOLD)
    }
}

impl ReportNormalizer {
    pub fn new(fraud_threshold: f64) -> Self {
        Self { fraud_threshold }
    }

    pub fn fraud_threshold(&self) -> f64 {
        self.fraud_threshold
    }

    /// Never fails: absent fields take their defaults, the raw payload is kept as is.
    pub fn normalize(&self, token_id: &str, raw: Value) -> NormalizedReport {
        let score = raw.f64_or("/score_normalised", 0.0);
        let creator_balance = raw.f64_or("/creatorBalance", 0.0);
        let supply = raw.nonzero_f64_or("/token/supply", DEFAULT_SUPPLY);
        let decimals = raw.nonzero_f64_or("/token/decimals", DEFAULT_DECIMALS);
        let price = non_negative(raw.f64_or("/price", 0.0));
        let liquidity = non_negative(raw.f64_or("/totalMarketLiquidity", 0.0));
        let holders = non_negative(raw.f64_or("/totalHolders", 0.0)) as i64;

        let market_cap = non_negative(price * (supply / 10f64.powf(decimals)));
        let creator_holdings_pct = if supply > 0.0 {
            non_negative(creator_balance / supply * 100.0)
        } else {
            0.0
        };

        NormalizedReport {
            token_id: token_id.to_string(),
            name: raw.str_or("/tokenMeta/name", DEFAULT_NAME),
            symbol: raw.str_or("/tokenMeta/symbol", DEFAULT_SYMBOL),
            score_normalised: score,
            risk_level: RiskLevel::from_score(score, self.fraud_threshold),
            price,
            holders,
            liquidity,
            market_cap,
            creator_holdings_pct,
            detected_at: raw.str_or("/detectedAt", ""),
            raw_json: raw,
        }
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Human readable risk descriptions from `risks[]`.
pub fn anomalies(raw: &Value) -> Vec<String> {
    let risks = raw.get("risks").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);

    let mut out: Vec<String> = risks
        .iter()
        .map(|risk| {
            let name = risk.str_or("/name", "Unknown risk");
            let mut desc = risk.str_or("/description", &name);
            if let Some(value) = risk_value(risk) {
                desc.push_str(&format!(" ({})", value));
            }
            desc
        })
        .collect();

    if out.is_empty() {
        out.push(NO_RISKS.to_string());
    }
    out
}

fn risk_value(risk: &Value) -> Option<String> {
    match risk.get("value")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}
