//! Bounded per-location reading history.
//!
//! Each location key owns a top-level city document plus a `history`
//! subcollection holding at most `max_retained` readings. A write beyond
//! the bound replaces the oldest reading in place (slot reuse), so the
//! series never grows past the bound, even transiently. Per-key writes are
//! serialized by an async mutex held only around the read-then-write
//! sequence.

use crate::doc::DocumentStore;
use chrono::{DateTime, Utc};
use common::{AqiReading, CityDoc, Error, ReadingSource, Result, AQI_MAX, AQI_MIN};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const CITIES: &str = "air_quality";
const HISTORY: &str = "history";

/// One stored history item, with its parsed timestamp when available.
struct StoredItem {
    item_id: String,
    reading: Option<AqiReading>,
    observed_at: Option<DateTime<Utc>>,
}

/// Bounded history store over a generic document store.
pub struct HistoryStore<S> {
    store: Arc<S>,
    max_retained: usize,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<S: DocumentStore> HistoryStore<S> {
    pub fn new(store: Arc<S>, max_retained: usize) -> Self {
        Self {
            store,
            max_retained: max_retained.max(1),
            locks: DashMap::new(),
        }
    }

    pub fn max_retained(&self) -> usize {
        self.max_retained
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load_items(&self, key: &str) -> Result<Vec<StoredItem>> {
        let raw = self.store.item_stream(CITIES, key, HISTORY).await?;
        let mut items = Vec::with_capacity(raw.len());
        for (item_id, value) in raw {
            let reading = match serde_json::from_value::<AqiReading>(value) {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!("skipping malformed history item {}/{}: {}", key, item_id, e);
                    None
                }
            };
            let observed_at = reading.as_ref().and_then(|r| {
                let ts = r.observed_at();
                if ts.is_none() {
                    warn!(
                        "history item {}/{} has unparsable timestamp {:?}",
                        key, item_id, r.last_update
                    );
                }
                ts
            });
            items.push(StoredItem {
                item_id,
                reading,
                observed_at,
            });
        }
        Ok(items)
    }

    /// Insert a reading into the key's series, creating the series on first
    /// write and rotating out the oldest reading once at capacity. The
    /// rotation victim includes the incoming reading itself: a reading
    /// older than everything retained is dropped, keeping the series equal
    /// to the most recent `max_retained` readings ever written.
    pub async fn append(&self, key: &str, reading: &AqiReading) -> Result<()> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let patch = CityDoc {
            name: key.to_string(),
            last_update: Some(reading.last_update.clone()),
        };
        self.store
            .set(CITIES, key, serde_json::to_value(&patch)?, true)
            .await?;

        let items = self.load_items(key).await?;
        let slot = if items.len() < self.max_retained {
            next_free_slot(&items)
        } else {
            let victim = oldest_item(&items);
            if reading.observed_at() <= victim.observed_at {
                debug!("dropping reading for {} older than retained window", key);
                return Ok(());
            }
            victim.item_id.clone()
        };

        debug!("appending reading for {} into slot {}", key, slot);
        self.store
            .item_set(CITIES, key, HISTORY, &slot, serde_json::to_value(reading)?)
            .await
    }

    /// Validate and ingest a caller-supplied reading. A missing timestamp
    /// defaults to now.
    pub async fn record(
        &self,
        key: &str,
        aqi: i64,
        last_update: Option<String>,
    ) -> Result<AqiReading> {
        if !(AQI_MIN..=AQI_MAX).contains(&aqi) {
            return Err(Error::InvalidReading(format!(
                "AQI {} outside [{}, {}]",
                aqi, AQI_MIN, AQI_MAX
            )));
        }
        let last_update = last_update.unwrap_or_else(|| Utc::now().to_rfc3339());
        let reading = AqiReading {
            aqi,
            last_update,
            source: ReadingSource::Measured,
            raw: None,
        };
        self.append(key, &reading).await?;
        Ok(reading)
    }

    /// Up to `limit` readings, newest first. A key with no series yields an
    /// empty sequence, never an error.
    pub async fn recent(&self, key: &str, limit: usize) -> Result<Vec<AqiReading>> {
        let items = self.load_items(key).await?;
        let mut readings: Vec<(DateTime<Utc>, AqiReading)> = items
            .into_iter()
            .filter_map(|item| match (item.observed_at, item.reading) {
                (Some(ts), Some(r)) => Some((ts, r)),
                _ => None,
            })
            .collect();
        readings.sort_by(|a, b| b.0.cmp(&a.0));
        readings.truncate(limit);
        Ok(readings.into_iter().map(|(_, r)| r).collect())
    }

    /// Delete the series and the city record together. Returns the number
    /// of deleted documents; flushing an absent key returns 0.
    pub async fn flush(&self, key: &str) -> Result<u64> {
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        let items = self.store.item_stream(CITIES, key, HISTORY).await?;
        let mut deleted = 0u64;
        for (item_id, _) in items {
            if self.store.item_delete(CITIES, key, HISTORY, &item_id).await? {
                deleted += 1;
            }
        }
        if self.store.delete(CITIES, key).await? {
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Snapshot of every known location key. Ordering unspecified.
    pub async fn all_keys(&self) -> Result<Vec<String>> {
        self.store.list_ids(CITIES).await
    }
}

/// Smallest numeric slot id not already in use.
fn next_free_slot(items: &[StoredItem]) -> String {
    let used: Vec<&str> = items.iter().map(|i| i.item_id.as_str()).collect();
    let mut slot = 0usize;
    while used.contains(&slot.to_string().as_str()) {
        slot += 1;
    }
    slot.to_string()
}

/// Item holding the oldest reading. Malformed items sort first so they are
/// rotated out before any parseable reading.
fn oldest_item(items: &[StoredItem]) -> &StoredItem {
    let mut victim = &items[0];
    for item in &items[1..] {
        if item.observed_at < victim.observed_at {
            victim = item;
        }
    }
    victim
}
