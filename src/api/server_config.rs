//! Server configuration constants

use std::time::Duration;

/// Concurrent request limit
pub const MAX_CONCURRENCY: usize = 256;

/// Per-request timeout. Covers one upstream fetch plus one remote
/// classification, each bounded by the client timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(75);

/// `Access-Control-Allow-Origin`
pub const CORS_ALLOW_ORIGIN: &str = "*";

/// `Access-Control-Allow-Methods`
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// `Access-Control-Allow-Headers`
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";
