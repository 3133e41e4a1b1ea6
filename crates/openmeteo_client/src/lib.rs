//! Open-Meteo air-quality client.
//!
//! Resolves a location name to coordinates via the Open-Meteo geocoding
//! API, then fetches the current air-quality indices for that point and
//! converts them into a single [`AqiReading`].

use async_trait::async_trait;
use chrono::Utc;
use common::config::ProviderConfig;
use common::{AirQualityProvider, AqiReading, Error, ReadingSource, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

/// Open-Meteo API client with connection pooling and a request timeout.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    geocoding_url: String,
    air_quality_url: String,
}

// ── Response types ────────────────────────────────────────────────────

/// Response from the geocoding search endpoint.
#[derive(Debug, Deserialize)]
pub struct GeocodingResponse {
    #[serde(default)]
    pub results: Vec<GeoMatch>,
}

/// One geocoding match.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoMatch {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
}

/// Response from the current air-quality endpoint.
#[derive(Debug, Deserialize)]
pub struct AirQualityResponse {
    pub current: CurrentAirQuality,
}

/// Current pollutant indices for one point. Any index may be absent
/// depending on the model domain covering the coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentAirQuality {
    #[serde(default)]
    pub us_aqi: Option<f64>,
    #[serde(default)]
    pub european_aqi: Option<f64>,
    #[serde(default)]
    pub pm2_5: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
}

// ── Implementation ────────────────────────────────────────────────────

impl OpenMeteoClient {
    pub fn new(cfg: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("airwatch/0.1")
            .pool_max_idle_per_host(4)
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            geocoding_url: cfg.geocoding_url.clone(),
            air_quality_url: cfg.air_quality_url.clone(),
        })
    }

    /// Resolve a location name to its best geocoding match.
    pub async fn geocode(&self, location: &str) -> Result<GeoMatch> {
        debug!("Geocoding {}", location);

        let resp = self
            .client
            .get(&self.geocoding_url)
            .query(&[
                ("name", location),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("geocoding request for {}: {}", location, e)))?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(Error::Upstream(format!(
                "geocoding returned {} for {}",
                status, location
            )));
        }

        let data: GeocodingResponse = resp
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("geocoding parse for {}: {}", location, e)))?;

        data.results
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(location.to_string()))
    }

    /// Fetch the current air-quality indices for a coordinate pair.
    pub async fn current_air_quality(&self, lat: f64, lon: f64) -> Result<CurrentAirQuality> {
        debug!("Fetching air quality for lat={} lon={}", lat, lon);

        let resp = self
            .client
            .get(&self.air_quality_url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("current", "european_aqi,us_aqi,pm2_5,pm10".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("air-quality request: {}", e)))?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(Error::Upstream(format!("air-quality returned {}", status)));
        }

        let data: AirQualityResponse = resp
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("air-quality parse: {}", e)))?;

        Ok(data.current)
    }
}

/// Build a reading from the current indices.
///
/// The US AQI is the canonical value; when the model domain does not carry
/// it, the European index stands in and the reading is marked interpolated.
fn reading_from_current(geo: &GeoMatch, current: &CurrentAirQuality) -> Result<AqiReading> {
    let (value, source) = match (current.us_aqi, current.european_aqi) {
        (Some(us), _) => (us, ReadingSource::Measured),
        (None, Some(eu)) => {
            warn!("{}: no us_aqi in domain, using european_aqi", geo.name);
            (eu, ReadingSource::Interpolated)
        }
        (None, None) => {
            return Err(Error::Upstream(format!(
                "provider returned no AQI for {}",
                geo.name
            )))
        }
    };

    Ok(AqiReading {
        aqi: value.round() as i64,
        last_update: Utc::now().to_rfc3339(),
        source,
        raw: Some(json!({
            "european_aqi": current.european_aqi,
            "us_aqi": current.us_aqi,
            "pm2_5": current.pm2_5,
            "pm10": current.pm10,
            "latitude": geo.latitude,
            "longitude": geo.longitude,
        })),
    })
}

#[async_trait]
impl AirQualityProvider for OpenMeteoClient {
    async fn fetch(&self, location: &str) -> Result<AqiReading> {
        let geo = self.geocode(location).await?;
        debug!(
            "Resolved {} to {} ({}, {})",
            location, geo.name, geo.latitude, geo.longitude
        );

        let current = self.current_air_quality(geo.latitude, geo.longitude).await?;
        reading_from_current(&geo, &current)
    }
}
