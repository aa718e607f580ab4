//! Rule-based fraud classifier
//!
//! Additive threshold scoring over a [`FeatureVector`]. Each triggered rule adds
//! a fixed weight; the sum is clamped to `[0,1]` and compared against 0.5.
//! Weights are counted in tenths so sums are exact.

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;

/// Liquidity below 10% of scale (1k USD)
const LOW_LIQUIDITY: f64 = 0.1;
const LOW_LIQUIDITY_WEIGHT: u32 = 4;
/// Fewer than 50 holders
const FEW_HOLDERS: f64 = 0.05;
const FEW_HOLDERS_WEIGHT: u32 = 3;
/// Creator holds more than 80% of supply
const CREATOR_HEAVY: f64 = 0.8;
const CREATOR_HEAVY_WEIGHT: u32 = 2;
/// Single holder owns more than 90%
const TOP_HOLDER_DOMINANT: f64 = 0.9;
const TOP_HOLDER_DOMINANT_WEIGHT: u32 = 3;

const FRAUD_CUTOFF: f64 = 0.5;

/// Classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FraudLabel {
    Legitimate,
    Fraud,
}

/// Output of a classifier run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// 1 for fraud, 0 otherwise
    pub prediction: u8,
    pub is_fraud: bool,
    pub fraud_probability: f64,
    /// `max(p, 1 - p)`
    pub prediction_confidence: f64,
    pub label: FraudLabel,
}

impl ClassificationResult {
    /// Build a result from a fraud probability in `[0,1]`.
    pub fn from_probability(probability: f64) -> Self {
        let p = super::features::clamp_unit(probability);
        let is_fraud = p >= FRAUD_CUTOFF;
        Self {
            prediction: u8::from(is_fraud),
            is_fraud,
            fraud_probability: p,
            prediction_confidence: p.max(1.0 - p),
            label: if is_fraud {
                FraudLabel::Fraud
            } else {
                FraudLabel::Legitimate
            },
        }
    }
}

/// Classify a feature vector. Pure.
pub fn classify(features: &FeatureVector) -> ClassificationResult {
    let mut tenths = 0u32;

    if features.liquidity < LOW_LIQUIDITY {
        tenths += LOW_LIQUIDITY_WEIGHT;
    }
    if features.holders < FEW_HOLDERS {
        tenths += FEW_HOLDERS_WEIGHT;
    }
    if features.creator_pct > CREATOR_HEAVY {
        tenths += CREATOR_HEAVY_WEIGHT;
    }
    if features.top_holder_pct > TOP_HOLDER_DOMINANT {
        tenths += TOP_HOLDER_DOMINANT_WEIGHT;
    }

    ClassificationResult::from_probability(f64::from(tenths) / 10.0)
}
