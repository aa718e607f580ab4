use super::{AppConfig, ConfigError};

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_CACHE_TTL_HOURS: &str = "RISK_CACHE_TTL_HOURS";
pub const ENV_FRAUD_THRESHOLD: &str = "RISK_FRAUD_THRESHOLD";
pub const ENV_RUGCHECK_BASE_URL: &str = "RUGCHECK_BASE_URL";
pub const ENV_REPLICATE_API_TOKEN: &str = "REPLICATE_API_TOKEN";
pub const ENV_SERVER_HOST: &str = "SERVER_HOST";
pub const ENV_SERVER_PORT: &str = "SERVER_PORT";

/// Apply environment overrides. `lookup` is `std::env::var` in the binary.
pub fn apply_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_DATABASE_URL) {
        config.storage.database_url = url;
    }
    if let Some(v) = lookup(ENV_CACHE_TTL_HOURS) {
        config.cache.ttl_hours = parse(ENV_CACHE_TTL_HOURS, v)?;
    }
    if let Some(v) = lookup(ENV_FRAUD_THRESHOLD) {
        config.detection.fraud_threshold = parse(ENV_FRAUD_THRESHOLD, v)?;
    }
    if let Some(url) = lookup(ENV_RUGCHECK_BASE_URL) {
        config.report_source.base_url = url;
    }
    if let Some(token) = lookup(ENV_REPLICATE_API_TOKEN).filter(|t| !t.trim().is_empty()) {
        config.classifier.api_token = Some(token);
    }
    if let Some(host) = lookup(ENV_SERVER_HOST) {
        config.server.host = host;
    }
    if let Some(v) = lookup(ENV_SERVER_PORT) {
        config.server.port = parse(ENV_SERVER_PORT, v)?;
    }
    Ok(())
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = AppConfig::default();
        apply_overrides(
            &mut config,
            env(&[
                ("DATABASE_URL", "sqlite::memory:"),
                ("RISK_CACHE_TTL_HOURS", "12"),
                ("RISK_FRAUD_THRESHOLD", "63"),
                ("RUGCHECK_BASE_URL", "http://localhost:9999"),
                ("REPLICATE_API_TOKEN", "r8_abc"),
                ("SERVER_PORT", "8080"),
            ]),
        )
        .unwrap();

        assert_eq!(config.storage.database_url, "sqlite::memory:");
        assert_eq!(config.cache.ttl_hours, 12);
        assert_eq!(config.detection.fraud_threshold, 63.0);
        assert_eq!(config.report_source.base_url, "http://localhost:9999");
        assert_eq!(config.classifier.api_token.as_deref(), Some("r8_abc"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_blank_token_ignored() {
        let mut config = AppConfig::default();
        apply_overrides(&mut config, env(&[("REPLICATE_API_TOKEN", "   ")])).unwrap();
        assert!(config.classifier.api_token.is_none());
    }

    #[test]
    fn test_unparsable_value() {
        let mut config = AppConfig::default();
        let err = apply_overrides(&mut config, env(&[("SERVER_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "SERVER_PORT", .. }));
    }
}
