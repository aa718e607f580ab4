pub mod risk;

// Re-export so handlers can use `crate::service::RiskService`
pub use risk::{CacheLookup, DetectionView, PredictionView, RiskService, ServiceSettings};
