//! API handlers, split by endpoint group

pub mod health;
pub mod predict;
pub mod tokens;

pub use health::health_check;
pub use predict::{detect_token, missing_token_id, predict_token};
pub use tokens::{get_stats, list_tokens, not_found};
