//! Shared fakes for the crate's unit tests.

use async_trait::async_trait;
use chrono::Utc;
use common::{AirQualityProvider, AqiReading, Error, ReadingSource, Result};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Call-counting provider fake. Locations in the fail set resolve to
/// `NotFound`; `transport_fail` makes every call an upstream error.
pub struct FakeProvider {
    aqi: AtomicI64,
    calls: AtomicUsize,
    fail_for: Mutex<Vec<String>>,
    transport_fail: bool,
}

impl FakeProvider {
    pub fn returning(aqi: i64) -> Self {
        Self {
            aqi: AtomicI64::new(aqi),
            calls: AtomicUsize::new(0),
            fail_for: Mutex::new(Vec::new()),
            transport_fail: false,
        }
    }

    pub fn failing_for(locations: &[&str]) -> Self {
        let fake = Self::returning(42);
        for location in locations {
            fake.fail_location(location);
        }
        fake
    }

    pub fn transport_failing() -> Self {
        Self {
            aqi: AtomicI64::new(42),
            calls: AtomicUsize::new(0),
            fail_for: Mutex::new(Vec::new()),
            transport_fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Change the AQI subsequent fetches report.
    pub fn set_aqi(&self, aqi: i64) {
        self.aqi.store(aqi, Ordering::SeqCst);
    }

    /// Make subsequent fetches for one location fail with `NotFound`.
    pub fn fail_location(&self, location: &str) {
        self.fail_for
            .lock()
            .expect("fail set lock")
            .push(location.to_string());
    }

    fn fails(&self, location: &str) -> bool {
        self.fail_for
            .lock()
            .expect("fail set lock")
            .iter()
            .any(|l| l == location)
    }
}

#[async_trait]
impl AirQualityProvider for FakeProvider {
    async fn fetch(&self, location: &str) -> Result<AqiReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.transport_fail {
            return Err(Error::Upstream("connection refused".into()));
        }
        if self.fails(location) {
            return Err(Error::NotFound(location.to_string()));
        }
        Ok(AqiReading {
            aqi: self.aqi.load(Ordering::SeqCst),
            last_update: Utc::now().to_rfc3339(),
            source: ReadingSource::Measured,
            raw: None,
        })
    }
}
