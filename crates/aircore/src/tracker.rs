//! Per-user tracked-location registry.
//!
//! Each user owns one persisted document holding their tracked map. A
//! location must resolve to real data before it can be tracked; listing
//! fans out across the tracked set and joins each key with its current
//! history view.

use crate::resolver::Resolver;
use chrono::Utc;
use common::{
    normalize_location, AirQualityProvider, Result, TrackOutcome, TrackedEntry, TrackedView,
    UntrackOutcome, UserDoc, UserIdentity,
};
use std::sync::Arc;
use store::DocumentStore;
use tracing::{info, warn};

const USERS: &str = "users";

pub struct Tracker<S, P> {
    store: Arc<S>,
    resolver: Arc<Resolver<S, P>>,
}

impl<S: DocumentStore, P: AirQualityProvider> Tracker<S, P> {
    pub fn new(store: Arc<S>, resolver: Arc<Resolver<S, P>>) -> Self {
        Self { store, resolver }
    }

    async fn load_user_doc(&self, uid: &str) -> Result<UserDoc> {
        match self.store.get(USERS, uid).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(UserDoc::default()),
        }
    }

    async fn save_user_doc(&self, uid: &str, doc: &UserDoc) -> Result<()> {
        self.store
            .set(USERS, uid, serde_json::to_value(doc)?, true)
            .await
    }

    /// Track a location for a user. The location must resolve to real data
    /// first; tracking something already tracked is an idempotent success.
    pub async fn track(&self, user: &UserIdentity, location: &str) -> Result<TrackOutcome> {
        let key = normalize_location(location);
        let mut doc = self.load_user_doc(&user.uid).await?;

        if doc.tracked.contains_key(&key) {
            return Ok(TrackOutcome::AlreadyTracked);
        }

        // Propagates NotFound: no entry is created for a location with no
        // data behind it.
        self.resolver.get_or_fetch(&key).await?;

        doc.tracked.insert(
            key.clone(),
            TrackedEntry {
                added_at: Utc::now().to_rfc3339(),
                notify: false,
            },
        );
        self.save_user_doc(&user.uid, &doc).await?;
        info!("user {} now tracks {}", user.uid, key);
        Ok(TrackOutcome::Added)
    }

    /// Stop tracking a location. Removing an absent entry is a success.
    pub async fn untrack(&self, user: &UserIdentity, location: &str) -> Result<UntrackOutcome> {
        let key = normalize_location(location);
        let mut doc = self.load_user_doc(&user.uid).await?;

        if doc.tracked.remove(&key).is_none() {
            return Ok(UntrackOutcome::NotTracked);
        }
        self.save_user_doc(&user.uid, &doc).await?;
        info!("user {} no longer tracks {}", user.uid, key);
        Ok(UntrackOutcome::Removed)
    }

    /// Join every tracked location with its current history view. A failed
    /// per-key read degrades that entry to an empty history instead of
    /// failing the whole listing.
    pub async fn list_tracked(&self, user: &UserIdentity) -> Result<Vec<TrackedView>> {
        let doc = self.load_user_doc(&user.uid).await?;

        let mut views = Vec::with_capacity(doc.tracked.len());
        for (location, entry) in doc.tracked {
            let history = match self.resolver.get_or_fetch(&location).await {
                Ok((readings, _)) => readings,
                Err(e) => {
                    warn!("tracked view for {} degraded: {}", location, e);
                    Vec::new()
                }
            };
            views.push(TrackedView {
                location,
                entry,
                history,
            });
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeProvider;
    use common::Role;
    use store::{HistoryStore, MemoryStore};

    fn make_tracker(provider: Arc<FakeProvider>) -> Tracker<MemoryStore, FakeProvider> {
        let store = Arc::new(MemoryStore::new());
        let history = Arc::new(HistoryStore::new(Arc::clone(&store), 5));
        let resolver = Arc::new(Resolver::new(history, provider, 5));
        Tracker::new(store, resolver)
    }

    fn guest() -> UserIdentity {
        UserIdentity {
            uid: "u1".into(),
            email: "guest@example.com".into(),
            role: Role::Guest,
        }
    }

    #[tokio::test]
    async fn test_track_is_idempotent() {
        let provider = Arc::new(FakeProvider::returning(42));
        let tracker = make_tracker(Arc::clone(&provider));
        let user = guest();

        assert_eq!(tracker.track(&user, "Warsaw").await.unwrap(), TrackOutcome::Added);
        assert_eq!(
            tracker.track(&user, "Warsaw").await.unwrap(),
            TrackOutcome::AlreadyTracked
        );

        let views = tracker.list_tracked(&user).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].location, "Warsaw");

        // The second track never re-validated against the provider.
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_track_normalizes_location() {
        let provider = Arc::new(FakeProvider::returning(42));
        let tracker = make_tracker(provider);
        let user = guest();

        tracker.track(&user, "  Warsaw ").await.unwrap();
        assert_eq!(
            tracker.track(&user, "Warsaw").await.unwrap(),
            TrackOutcome::AlreadyTracked
        );
    }

    #[tokio::test]
    async fn test_track_unknown_location_creates_nothing() {
        let provider = Arc::new(FakeProvider::failing_for(&["Atlantis"]));
        let tracker = make_tracker(provider);
        let user = guest();

        assert!(tracker.track(&user, "Atlantis").await.is_err());
        assert!(tracker.list_tracked(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_untrack_is_idempotent() {
        let provider = Arc::new(FakeProvider::returning(42));
        let tracker = make_tracker(provider);
        let user = guest();

        tracker.track(&user, "Warsaw").await.unwrap();
        assert_eq!(
            tracker.untrack(&user, "Warsaw").await.unwrap(),
            UntrackOutcome::Removed
        );
        assert_eq!(
            tracker.untrack(&user, "Warsaw").await.unwrap(),
            UntrackOutcome::NotTracked
        );
        assert!(tracker.list_tracked(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_untrack_leaves_series_alone() {
        let provider = Arc::new(FakeProvider::returning(42));
        let tracker = make_tracker(provider);
        let user = guest();

        tracker.track(&user, "Warsaw").await.unwrap();
        tracker.untrack(&user, "Warsaw").await.unwrap();

        let history = tracker.resolver.history();
        assert_eq!(history.recent("Warsaw", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_listing_degrades_per_key() {
        let provider = Arc::new(FakeProvider::returning(42));
        let tracker = make_tracker(Arc::clone(&provider));
        let user = guest();

        tracker.track(&user, "Warsaw").await.unwrap();
        tracker.track(&user, "Krakow").await.unwrap();

        // Wipe one series so its re-read must hit the provider, and make
        // the provider refuse it.
        tracker.resolver.history().flush("Krakow").await.unwrap();
        provider.fail_location("Krakow");

        let views = tracker.list_tracked(&user).await.unwrap();
        assert_eq!(views.len(), 2);
        let krakow = views.iter().find(|v| v.location == "Krakow").unwrap();
        assert!(krakow.history.is_empty());
        let warsaw = views.iter().find(|v| v.location == "Warsaw").unwrap();
        assert_eq!(warsaw.history.len(), 1);
    }

    #[tokio::test]
    async fn test_tracked_sets_are_scoped_per_user() {
        let provider = Arc::new(FakeProvider::returning(42));
        let tracker = make_tracker(provider);
        let alice = guest();
        let bob = UserIdentity {
            uid: "u2".into(),
            email: "bob@example.com".into(),
            role: Role::Guest,
        };

        tracker.track(&alice, "Warsaw").await.unwrap();
        assert!(tracker.list_tracked(&bob).await.unwrap().is_empty());
    }
}
