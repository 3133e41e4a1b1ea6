//! Service configuration types.

use crate::Role;
use serde::{Deserialize, Serialize};

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// History retention bound per location. The live data path retains 5
    /// readings; a write beyond the bound replaces the oldest in place.
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,

    /// How many readings a cached view reads back, newest first.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    /// Background refresh interval in seconds.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Provider endpoints and timeouts.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Static credential table for the bundled authenticator.
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_retained: default_max_retained(),
            recent_limit: default_recent_limit(),
            refresh_interval_secs: default_refresh_interval(),
            provider: ProviderConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Upstream provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Geocoding search endpoint.
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,

    /// Current air-quality endpoint.
    #[serde(default = "default_air_quality_url")]
    pub air_quality_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            air_quality_url: default_air_quality_url(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

/// One credential the bundled authenticator accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticUser {
    pub token: String,
    pub uid: String,
    pub email: String,
    pub role: Role,
}

/// Static credential table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub users: Vec<StaticUser>,
}

fn default_max_retained() -> usize {
    5
}

fn default_recent_limit() -> usize {
    5
}

fn default_refresh_interval() -> u64 {
    21_600 // 6 hours
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".into()
}

fn default_air_quality_url() -> String {
    "https://air-quality-api.open-meteo.com/v1/air-quality".into()
}

fn default_provider_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.max_retained, 5);
        assert_eq!(cfg.recent_limit, 5);
        assert_eq!(cfg.refresh_interval_secs, 21_600);
        assert!(cfg.auth.users.is_empty());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = toml::from_str("max_retained = 10").unwrap();
        assert_eq!(cfg.max_retained, 10);
        assert_eq!(cfg.recent_limit, 5);
        assert!(cfg.provider.geocoding_url.contains("open-meteo"));
    }
}
