//! Shared types, config, error definitions, and collaborator seams
//! for the air-quality tracking service.

pub mod auth;
pub mod config;
pub mod error;
pub mod provider;
pub mod types;

pub use auth::{ensure_admin, Authenticator};
pub use config::AppConfig;
pub use error::Error;
pub use provider::AirQualityProvider;
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
