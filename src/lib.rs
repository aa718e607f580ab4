// src/lib.rs
//! Token risk detection service.
//!
//! Fetches third-party token risk reports, scores them with a rule-based or
//! remote classifier, caches the results in SQLite and serves them over HTTP.

pub mod api;
pub mod config;
pub mod core;
pub mod detection;
pub mod report;
pub mod service;
pub mod storage;

pub use crate::core::errors::{Result, RiskError};
