//! Error taxonomy for the token risk pipeline.
//!
//! Validation, upstream and network errors end a request. Persistence and
//! deserialization errors are recovered where they occur and only logged.

use thiserror::Error;

/// Errors produced while answering a risk query.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Missing or malformed token id.
    #[error("{0}")]
    Validation(String),

    /// The report source answered with a non-success status.
    #[error("API returned status code: {status}")]
    Upstream { status: u16 },

    /// The report source could not be reached at all.
    #[error("{0}")]
    Network(String),

    /// Cache write failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Cache read or aggregate query failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Cached raw payload is not valid JSON.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// No route matched the request path.
    #[error("Not Found")]
    NotFound,

    /// Anything else, e.g. an undecodable upstream body.
    #[error("{0}")]
    Internal(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RiskError>;

impl RiskError {
    /// HTTP status this error maps to when it reaches a client.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Upstream { status } => *status,
            Self::NotFound => 404,
            Self::Network(_)
            | Self::Persistence(_)
            | Self::Storage(_)
            | Self::Deserialization(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Human readable summary placed in the `message` field of error bodies.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Please provide a valid token ID",
            Self::Upstream { .. } => "Failed to fetch token data",
            Self::Network(_) => "Network error occurred while fetching token data",
            Self::NotFound => "Endpoint not found",
            _ => "An unexpected error occurred",
        }
    }

    /// Errors that are handled locally and never change a response.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Deserialization(_))
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(err: serde_json::Error) -> Self {
        RiskError::Deserialization(err.to_string())
    }
}

impl From<sqlx::Error> for RiskError {
    fn from(err: sqlx::Error) -> Self {
        RiskError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_display_and_status() {
        let err = RiskError::Upstream { status: 404 };
        assert_eq!(err.to_string(), "API returned status code: 404");
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.user_message(), "Failed to fetch token data");
    }

    #[test]
    fn test_network_error_is_500() {
        let err = RiskError::Network("dns failure".to_string());
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "dns failure");
        assert!(err.user_message().starts_with("Network error"));
    }

    #[test]
    fn test_validation_maps_to_400() {
        let err = RiskError::Validation("Token ID is required".to_string());
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.user_message(), "Please provide a valid token ID");
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(RiskError::Persistence("disk full".into()).is_recoverable());
        assert!(RiskError::Deserialization("eof".into()).is_recoverable());
        assert!(!RiskError::Upstream { status: 502 }.is_recoverable());
        assert!(!RiskError::NotFound.is_recoverable());
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: RiskError = parse_err.into();
        assert!(matches!(err, RiskError::Deserialization(_)));
    }
}
