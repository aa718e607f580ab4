//! Token risk detection
//!
//! Turns an untyped risk report into a fraud classification.
//!
//! ## Components
//! - `features`: report -> normalized feature vector
//! - `rules`: additive threshold classifier over the feature vector
//! - `classifier`: classification capability (rule based or remote model)

pub mod classifier;
pub mod features;
pub mod rules;

pub use classifier::{select_classifier, RemoteClassifier, RiskClassifier, RuleClassifier};
pub use features::{FeatureExtractor, FeatureVector, RiskMarkers};
pub use rules::{classify, ClassificationResult, FraudLabel};

/// Default `score_normalised` at or above which a token is flagged as fraud.
pub const DEFAULT_FRAUD_THRESHOLD: f64 = 62.0;
