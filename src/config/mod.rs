//! Service configuration
//!
//! Layering, lowest priority first: built-in defaults, TOML file, environment,
//! command line flags (applied by the binary).

pub mod env_config;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::DEFAULT_FRAUD_THRESHOLD;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_RUGCHECK_BASE_URL: &str = "https://api.rugcheck.xyz/v1";
pub const DEFAULT_CLASSIFIER_ENDPOINT: &str = "https://api.replicate.com/v1/predictions";
pub const DEFAULT_MODEL_VERSION: &str =
    "enhance-replicate/tcap_finale:6975488a19ab9c27d9656ea29a711dd0471b53e6ec15cb17699f9cbd714980cc";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8787 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { database_url: "sqlite://./data/token_reports.db".to_string(), max_connections: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a stored report is served without refetching
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_hours: 24 }
    }
}

impl CacheConfig {
    /// Capped at roughly a century.
    pub fn ttl(&self) -> chrono::Duration {
        const MAX_TTL_HOURS: i64 = 876_600;
        let hours = i64::try_from(self.ttl_hours).unwrap_or(MAX_TTL_HOURS).min(MAX_TTL_HOURS);
        chrono::Duration::hours(hours)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// `score_normalised` at or above which a token is labelled Fraud
    pub fraud_threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { fraud_threshold: DEFAULT_FRAUD_THRESHOLD }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ReportSourceConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_RUGCHECK_BASE_URL.to_string(), timeout_secs: 30 }
    }
}

impl ReportSourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Remote model settings. The remote classifier is only used when
/// `api_token` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub api_token: Option<String>,
    pub endpoint: String,
    pub model_version: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            endpoint: DEFAULT_CLASSIFIER_ENDPOINT.to_string(),
            model_version: DEFAULT_MODEL_VERSION.to_string(),
        }
    }
}

impl ClassifierConfig {
    pub fn remote_enabled(&self) -> bool {
        self.api_token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub detection: DetectionConfig,
    pub report_source: ReportSourceConfig,
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a TOML file. A missing file yields the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io { path: path.display().to_string(), source }),
        }
    }

    /// Defaults, then `CONFIG_PATH` (or `config.toml`), then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        env_config::apply_overrides(&mut config, |key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl_hours == 0 {
            return Err(ConfigError::Invalid("cache.ttl_hours must be greater than 0".into()));
        }
        let threshold = self.detection.fraud_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "detection.fraud_threshold must be within 0..=100, got {}",
                threshold
            )));
        }
        if self.report_source.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("report_source.base_url must not be empty".into()));
        }
        Ok(())
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.classifier.api_token.is_some() {
            copy.classifier.api_token = Some("***".to_string());
        }
        copy
    }
}
