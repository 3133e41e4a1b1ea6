//! Next-day AQI trend prediction.
//!
//! A least-squares line is fit over (elapsed seconds, AQI) and evaluated
//! one day past the latest observation. Deterministic: identical input
//! series always yield the identical forecast.

use common::{AqiReading, Error, Result, AQI_MAX, AQI_MIN};
use std::collections::BTreeMap;

/// Minimum distinct valid readings required for a forecast.
pub const MIN_SAMPLES: usize = 5;

/// Forecast horizon past the latest observation, in seconds.
const HORIZON_SECS: f64 = 86_400.0;

/// Predict the next day's AQI from a series of readings.
///
/// Readings are deduplicated by timestamp (last write wins) and entries
/// with unparsable timestamps are discarded before the precondition check.
/// The forecast is clamped to the valid AQI domain and rounded.
pub fn predict_next_day(readings: &[AqiReading]) -> Result<i64> {
    // BTreeMap keeps the series sorted ascending while deduplicating;
    // later entries overwrite earlier ones at the same instant.
    let mut by_instant: BTreeMap<i64, f64> = BTreeMap::new();
    for reading in readings {
        if let Some(ts) = reading.observed_at() {
            by_instant.insert(ts.timestamp_millis(), reading.aqi as f64);
        }
    }

    let series: Vec<(i64, f64)> = by_instant.into_iter().collect();
    if series.len() < MIN_SAMPLES {
        return Err(Error::InsufficientData {
            have: series.len(),
            need: MIN_SAMPLES,
        });
    }

    let t0 = series[0].0;
    let points: Vec<(f64, f64)> = series
        .iter()
        .map(|(ts, aqi)| ((ts - t0) as f64 / 1000.0, *aqi))
        .collect();

    let n = points.len() as f64;
    let mean_t = points.iter().map(|(t, _)| t).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (t, y) in &points {
        num += (t - mean_t) * (y - mean_y);
        den += (t - mean_t) * (t - mean_t);
    }
    // Distinct timestamps guarantee a spread time axis; the guard only
    // protects against degenerate float collapse.
    let slope = if den == 0.0 { 0.0 } else { num / den };
    let intercept = mean_y - slope * mean_t;

    let t_max = points[points.len() - 1].0;
    let forecast = intercept + slope * (t_max + HORIZON_SECS);

    Ok(forecast.clamp(AQI_MIN as f64, AQI_MAX as f64).round() as i64)
}
