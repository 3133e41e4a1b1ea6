//! Configuration loader — merges env vars, .env file, and config.toml.

use common::config::StaticUser;
use common::{AppConfig, Error, Role};
use std::path::Path;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn validate_config(config: &AppConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.max_retained == 0 {
        issues.push("max_retained must be > 0".into());
    }
    if config.recent_limit == 0 {
        issues.push("recent_limit must be > 0".into());
    }
    if config.refresh_interval_secs == 0 {
        issues.push("refresh_interval_secs must be > 0".into());
    }
    if config.provider.timeout_secs == 0 {
        issues.push("provider.timeout_secs must be > 0".into());
    }
    if config.provider.geocoding_url.trim().is_empty() {
        issues.push("provider.geocoding_url must not be empty".into());
    }
    if config.provider.air_quality_url.trim().is_empty() {
        issues.push("provider.air_quality_url must not be empty".into());
    }
    for user in &config.auth.users {
        if user.token.trim().is_empty() {
            issues.push(format!("auth user {} has an empty token", user.uid));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load service configuration from environment and optional config file.
pub fn load_config() -> Result<AppConfig, Error> {
    // 1. Load .env file if present.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = AppConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(raw) = std::env::var("AIRWATCH_MAX_RETAINED") {
        config.max_retained = parse_positive_u64(&raw, "AIRWATCH_MAX_RETAINED")? as usize;
    }
    if let Ok(raw) = std::env::var("AIRWATCH_RECENT_LIMIT") {
        config.recent_limit = parse_positive_u64(&raw, "AIRWATCH_RECENT_LIMIT")? as usize;
    }
    if let Ok(raw) = std::env::var("AIRWATCH_REFRESH_INTERVAL_SECS") {
        config.refresh_interval_secs = parse_positive_u64(&raw, "AIRWATCH_REFRESH_INTERVAL_SECS")?;
    }
    if let Ok(raw) = std::env::var("AIRWATCH_PROVIDER_TIMEOUT_SECS") {
        config.provider.timeout_secs = parse_positive_u64(&raw, "AIRWATCH_PROVIDER_TIMEOUT_SECS")?;
    }
    if let Ok(token) = std::env::var("AIRWATCH_ADMIN_TOKEN") {
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(Error::Config(
                "AIRWATCH_ADMIN_TOKEN must not be empty when set".into(),
            ));
        }
        config.auth.users.push(StaticUser {
            token,
            uid: "admin".into(),
            email: "admin@localhost".into(),
            role: Role::Admin,
        });
    }

    // 5. Validate.
    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_retention_rejected() {
        let mut config = AppConfig::default();
        config.max_retained = 0;
        config.refresh_interval_secs = 0;
        match validate_config(&config) {
            Err(Error::Config(msg)) => {
                assert!(msg.contains("max_retained"));
                assert!(msg.contains("refresh_interval_secs"));
            }
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_auth_token_rejected() {
        let mut config = AppConfig::default();
        config.auth.users.push(StaticUser {
            token: "  ".into(),
            uid: "admin".into(),
            email: "admin@localhost".into(),
            role: Role::Admin,
        });
        assert!(validate_config(&config).is_err());
    }
}
