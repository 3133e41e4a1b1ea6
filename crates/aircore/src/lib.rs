//! Core service logic: cache-or-fetch resolution, the background refresh
//! scheduler, the per-user tracked-location registry, and trend prediction.

pub mod auth;
pub mod predict;
pub mod resolver;
pub mod scheduler;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::StaticAuthenticator;
pub use predict::predict_next_day;
pub use resolver::Resolver;
pub use scheduler::{RefreshScheduler, SweepStats};
pub use tracker::Tracker;
