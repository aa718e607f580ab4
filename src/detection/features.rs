//! Feature extraction
//!
//! Reduces a raw risk report to four normalized features in `[0,1]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ValueExt;

/// Liquidity (USD) at which the normalized feature saturates.
pub const LIQUIDITY_SCALE: f64 = 10_000.0;
/// Holder count at which the normalized feature saturates.
pub const HOLDERS_SCALE: f64 = 1_000.0;
/// Percentages are normalized against 100.
pub const PERCENT_SCALE: f64 = 100.0;

/// Normalized token features
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Market liquidity / 10k
    pub liquidity: f64,
    /// Holder count / 1k
    pub holders: f64,
    /// Creator share of supply
    pub creator_pct: f64,
    /// Largest holder share of supply
    pub top_holder_pct: f64,
}

impl FeatureVector {
    pub fn to_vector(&self) -> Vec<f64> {
        vec![self.liquidity, self.holders, self.creator_pct, self.top_holder_pct]
    }

    pub fn dimension() -> usize {
        4
    }
}

/// Named risk flags reported upstream in `risks[]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskMarkers {
    pub low_liquidity: bool,
    pub low_lp_providers: bool,
}

/// Stateless extractor over report JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the feature vector. Missing or mistyped fields count as zero,
    /// a missing or zero supply counts as one.
    pub fn extract(&self, report: &Value) -> FeatureVector {
        let liquidity = non_negative(report.f64_or("/totalMarketLiquidity", 0.0));
        let holders = non_negative(report.f64_or("/totalHolders", 0.0));
        let creator_balance = non_negative(report.f64_or("/creatorBalance", 0.0));
        let supply = non_negative(report.nonzero_f64_or("/token/supply", 1.0));
        let top_holder_pct = non_negative(report.f64_or("/topHolders/0/pct", 0.0));

        let creator_pct = if supply > 0.0 {
            creator_balance / supply * 100.0
        } else {
            0.0
        };

        FeatureVector {
            liquidity: clamp_unit(liquidity / LIQUIDITY_SCALE),
            holders: clamp_unit(holders / HOLDERS_SCALE),
            creator_pct: clamp_unit(creator_pct / PERCENT_SCALE),
            top_holder_pct: clamp_unit(top_holder_pct / PERCENT_SCALE),
        }
    }

    pub fn markers(&self, report: &Value) -> RiskMarkers {
        let mut markers = RiskMarkers::default();
        if let Some(risks) = report.get("risks").and_then(Value::as_array) {
            for risk in risks {
                match risk.get("name").and_then(Value::as_str) {
                    Some("Low Liquidity") => markers.low_liquidity = true,
                    Some("Low amount of LP Providers") => markers.low_lp_providers = true,
                    _ => {}
                }
            }
        }
        markers
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_nan() || v < 0.0 {
        0.0
    } else {
        v
    }
}

/// Clamp into `[0,1]`; NaN becomes 0.
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_basic() {
        let report = json!({
            "totalMarketLiquidity": 500.0,
            "totalHolders": 10,
            "creatorBalance": 900,
            "token": { "supply": 1000 },
            "topHolders": [{ "pct": 45.0 }]
        });
        let f = FeatureExtractor::new().extract(&report);
        assert!((f.liquidity - 0.05).abs() < 1e-12);
        assert!((f.holders - 0.01).abs() < 1e-12);
        assert!((f.creator_pct - 0.9).abs() < 1e-12);
        assert!((f.top_holder_pct - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_empty_report_is_all_zero() {
        let f = FeatureExtractor::new().extract(&json!({}));
        assert_eq!(f, FeatureVector::default());
        assert_eq!(f.to_vector().len(), FeatureVector::dimension());
    }

    #[test]
    fn test_saturates_at_one() {
        let report = json!({
            "totalMarketLiquidity": 1e12,
            "totalHolders": 50_000,
            "creatorBalance": 5000,
            "token": { "supply": 1000 },
            "topHolders": [{ "pct": 250.0 }]
        });
        let f = FeatureExtractor::new().extract(&report);
        assert_eq!(f.to_vector(), vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_negative_inputs_clamp_to_zero() {
        let report = json!({
            "totalMarketLiquidity": -400.0,
            "totalHolders": -3,
            "creatorBalance": -10,
            "token": { "supply": -1000 }
        });
        let f = FeatureExtractor::new().extract(&report);
        assert_eq!(f, FeatureVector::default());
    }

    #[test]
    fn test_zero_supply_defaults_to_one() {
        let report = json!({ "creatorBalance": 0.5, "token": { "supply": 0 } });
        let f = FeatureExtractor::new().extract(&report);
        assert!((f.creator_pct - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_markers() {
        let report = json!({
            "risks": [
                { "name": "Low Liquidity" },
                { "name": "Mutable metadata" }
            ]
        });
        let m = FeatureExtractor::new().markers(&report);
        assert!(m.low_liquidity);
        assert!(!m.low_lp_providers);
        assert_eq!(FeatureExtractor::new().markers(&json!({})), RiskMarkers::default());
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(f64::INFINITY), 1.0);
        assert_eq!(clamp_unit(-0.3), 0.0);
        assert_eq!(clamp_unit(0.25), 0.25);
    }
}
