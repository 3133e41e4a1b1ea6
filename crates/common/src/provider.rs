//! Seam for the upstream air-quality data source.

use crate::{AqiReading, Result};
use async_trait::async_trait;

/// Async fetch-by-name interface to the upstream provider.
///
/// One round trip per call; no retry contract is implied. A location the
/// provider cannot resolve surfaces as `Error::NotFound`, a transport
/// failure as `Error::Upstream` — the caller decides how to fold them.
#[async_trait]
pub trait AirQualityProvider: Send + Sync + 'static {
    async fn fetch(&self, location: &str) -> Result<AqiReading>;
}
