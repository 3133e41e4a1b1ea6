//! Cache-or-fetch resolution.
//!
//! Serves a location's history from the store when it has entries, and
//! backfills synchronously from the provider when it does not. This is the
//! only path by which a series comes into existence from live data.

use common::{AirQualityProvider, AqiReading, Error, Result};
use std::sync::Arc;
use store::{DocumentStore, HistoryStore};
use tracing::{debug, warn};

pub struct Resolver<S, P> {
    history: Arc<HistoryStore<S>>,
    provider: Arc<P>,
    recent_limit: usize,
}

impl<S: DocumentStore, P: AirQualityProvider> Resolver<S, P> {
    pub fn new(history: Arc<HistoryStore<S>>, provider: Arc<P>, recent_limit: usize) -> Self {
        Self {
            history,
            provider,
            recent_limit,
        }
    }

    pub fn history(&self) -> &Arc<HistoryStore<S>> {
        &self.history
    }

    /// Return the cached history for `key`, or backfill one reading from
    /// the provider when the series is empty. The second element reports
    /// whether a provider round trip happened.
    ///
    /// A provider miss and a provider transport failure both surface as
    /// `NotFound` — the caller cannot distinguish "no data exists" from
    /// "provider unreachable", and no data is ever fabricated. No per-key
    /// lock is held across the provider call.
    pub async fn get_or_fetch(&self, key: &str) -> Result<(Vec<AqiReading>, bool)> {
        let cached = self.history.recent(key, self.recent_limit).await?;
        if !cached.is_empty() {
            debug!("{}: served {} cached readings", key, cached.len());
            return Ok((cached, false));
        }

        let reading = match self.provider.fetch(key).await {
            Ok(r) => r,
            Err(Error::NotFound(_)) => return Err(Error::NotFound(key.to_string())),
            Err(e) => {
                warn!("{}: provider failure treated as no-data: {}", key, e);
                return Err(Error::NotFound(key.to_string()));
            }
        };

        self.history.append(key, &reading).await?;
        Ok((vec![reading], true))
    }
}
