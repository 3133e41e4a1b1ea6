//! Background refresh of every known series.
//!
//! One recurring task per process, owned by the scheduler object built at
//! startup. Each tick sweeps all known keys, fetching fresh data and
//! rotating it into the history store. The sweep is best-effort: per-key
//! failures are logged and isolated, never escalated.

use common::AirQualityProvider;
use std::sync::Arc;
use std::time::Duration;
use store::{DocumentStore, HistoryStore};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Counters for one refresh sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub refreshed: usize,
    pub failed: usize,
}

pub struct RefreshScheduler<S, P> {
    history: Arc<HistoryStore<S>>,
    provider: Arc<P>,
    interval: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<S: DocumentStore, P: AirQualityProvider> RefreshScheduler<S, P> {
    pub fn new(history: Arc<HistoryStore<S>>, provider: Arc<P>, interval: Duration) -> Self {
        Self {
            history,
            provider,
            interval,
            handle: Mutex::new(None),
        }
    }

    /// Run one sweep over every known key. Each key is refreshed
    /// independently; a failure for one key leaves the rest of the sweep
    /// untouched.
    pub async fn refresh_all(&self) -> SweepStats {
        let mut stats = SweepStats::default();

        let keys = match self.history.all_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("refresh sweep aborted, key enumeration failed: {}", e);
                return stats;
            }
        };

        for key in keys {
            match self.provider.fetch(&key).await {
                Ok(reading) => match self.history.append(&key, &reading).await {
                    Ok(()) => stats.refreshed += 1,
                    Err(e) => {
                        warn!("refresh write failed for {}: {}", key, e);
                        stats.failed += 1;
                    }
                },
                Err(e) => {
                    warn!("refresh fetch failed for {}: {}", key, e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "refresh sweep done: {} refreshed, {} failed",
            stats.refreshed, stats.failed
        );
        stats
    }

    /// Spawn the recurring sweep task. Idempotent: returns `false` without
    /// side effects when a live task already exists.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut guard = self.handle.lock().await;
        if let Some(handle) = guard.as_ref() {
            if !handle.is_finished() {
                return false;
            }
        }

        let this = Arc::clone(self);
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                this.refresh_all().await;
            }
        }));
        info!("refresh scheduler started (interval {:?})", self.interval);
        true
    }

    /// Stop the recurring task if one is running.
    pub async fn stop(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
            info!("refresh scheduler stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeProvider;
    use store::MemoryStore;

    fn make_scheduler(
        provider: Arc<FakeProvider>,
    ) -> Arc<RefreshScheduler<MemoryStore, FakeProvider>> {
        let history = Arc::new(HistoryStore::new(Arc::new(MemoryStore::new()), 5));
        Arc::new(RefreshScheduler::new(
            history,
            provider,
            Duration::from_secs(21_600),
        ))
    }

    #[tokio::test]
    async fn test_sweep_refreshes_every_key() {
        let provider = Arc::new(FakeProvider::returning(42));
        let scheduler = make_scheduler(Arc::clone(&provider));
        for key in ["Warsaw", "Krakow"] {
            scheduler.history.record(key, 10, None).await.unwrap();
        }

        let stats = scheduler.refresh_all().await;
        assert_eq!(stats, SweepStats { refreshed: 2, failed: 0 });
        assert_eq!(scheduler.history.recent("Warsaw", 10).await.unwrap().len(), 2);
        assert_eq!(scheduler.history.recent("Krakow", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_one_key_failure_does_not_abort_sweep() {
        let provider = Arc::new(FakeProvider::failing_for(&["Warsaw"]));
        let scheduler = make_scheduler(Arc::clone(&provider));
        scheduler.history.record("Warsaw", 10, None).await.unwrap();
        scheduler.history.record("Krakow", 10, None).await.unwrap();

        let stats = scheduler.refresh_all().await;
        assert_eq!(stats, SweepStats { refreshed: 1, failed: 1 });

        // The healthy key gained a reading; the failing key kept its old one.
        assert_eq!(scheduler.history.recent("Krakow", 10).await.unwrap().len(), 2);
        assert_eq!(scheduler.history.recent("Warsaw", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_rotates_at_capacity() {
        let provider = Arc::new(FakeProvider::returning(42));
        let scheduler = make_scheduler(Arc::clone(&provider));
        scheduler.history.record("Warsaw", 10, None).await.unwrap();

        for round in 0..7 {
            provider.set_aqi(100 + round);
            let stats = scheduler.refresh_all().await;
            assert_eq!(stats.refreshed, 1);
        }

        let recent = scheduler.history.recent("Warsaw", 10).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].aqi, 106);
    }

    #[tokio::test]
    async fn test_empty_store_sweeps_nothing() {
        let provider = Arc::new(FakeProvider::returning(42));
        let scheduler = make_scheduler(Arc::clone(&provider));

        let stats = scheduler.refresh_all().await;
        assert_eq!(stats, SweepStats::default());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let provider = Arc::new(FakeProvider::returning(42));
        let scheduler = make_scheduler(provider);

        assert!(scheduler.start().await);
        assert!(!scheduler.start().await);
        assert!(scheduler.is_running().await);

        scheduler.stop().await;
        assert!(!scheduler.is_running().await);

        // A stopped scheduler can be started again.
        assert!(scheduler.start().await);
        scheduler.stop().await;
    }
}
