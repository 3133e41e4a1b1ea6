//! Airwatch: air-quality tracking and prediction service.
//!
//! Single-binary Tokio application that:
//! 1. Caches bounded per-location AQI histories
//! 2. Refreshes every known location on a background interval
//! 3. Backfills unknown locations on demand from Open-Meteo
//! 4. Maintains per-user tracked-location sets
//! 5. Predicts next-day AQI from the stored trend

mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use aircore::{predict_next_day, RefreshScheduler, Resolver, StaticAuthenticator, Tracker};
use common::{ensure_admin, normalize_location, Authenticator, Error, TrackOutcome, UntrackOutcome, UserIdentity};
use openmeteo_client::OpenMeteoClient;
use store::{HistoryStore, MemoryStore};

/// Air-quality tracking service
#[derive(Parser)]
#[command(name = "airwatch", about = "Air-quality tracking and prediction service")]
struct Cli {
    /// Fetch (or serve from cache) the history for a location, then exit.
    #[arg(long, value_name = "LOCATION")]
    fetch: Option<String>,

    /// Record a reading for a location (requires --aqi), then exit.
    #[arg(long, value_name = "LOCATION")]
    record: Option<String>,

    /// AQI value for --record.
    #[arg(long)]
    aqi: Option<i64>,

    /// RFC 3339 timestamp for --record (defaults to now).
    #[arg(long)]
    timestamp: Option<String>,

    /// Predict tomorrow's AQI for a location, then exit.
    #[arg(long, value_name = "LOCATION")]
    predict: Option<String>,

    /// Track a location for the authenticated user, then exit.
    #[arg(long, value_name = "LOCATION")]
    track: Option<String>,

    /// Untrack a location for the authenticated user, then exit.
    #[arg(long, value_name = "LOCATION")]
    untrack: Option<String>,

    /// List the authenticated user's tracked locations, then exit.
    #[arg(long)]
    list_tracked: bool,

    /// Flush a location's series and city record (admin only), then exit.
    #[arg(long, value_name = "LOCATION")]
    flush: Option<String>,

    /// Bearer token for operations that need an identity.
    #[arg(long)]
    token: Option<String>,

    /// Run a single refresh sweep and exit.
    #[arg(long)]
    once: bool,
}

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

async fn resolve_identity(
    auth: &StaticAuthenticator,
    token: Option<&str>,
) -> common::Result<UserIdentity> {
    let Some(token) = token else {
        return Err(Error::Unauthorized("missing --token".into()));
    };
    auth.authenticate(token).await
}

fn exit_on_error<T>(result: common::Result<T>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!("{}: {}", context, e);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "airwatch=info,aircore=info,store=info,openmeteo_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    // Load configuration.
    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "History: max_retained={}, recent_limit={}, refresh every {}s",
        cfg.max_retained, cfg.recent_limit, cfg.refresh_interval_secs
    );

    // ── Shared components ────────────────────────────────────────────
    let store = Arc::new(MemoryStore::new());
    let history = Arc::new(HistoryStore::new(Arc::clone(&store), cfg.max_retained));
    let provider = match OpenMeteoClient::new(&cfg.provider) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            error!("Provider initialization failed: {}", e);
            std::process::exit(1);
        }
    };
    let resolver = Arc::new(Resolver::new(
        Arc::clone(&history),
        Arc::clone(&provider),
        cfg.recent_limit,
    ));
    let tracker = Tracker::new(Arc::clone(&store), Arc::clone(&resolver));
    let authenticator = StaticAuthenticator::new(&cfg.auth);
    let scheduler = Arc::new(RefreshScheduler::new(
        Arc::clone(&history),
        Arc::clone(&provider),
        Duration::from_secs(cfg.refresh_interval_secs),
    ));

    // ── One-shot modes ───────────────────────────────────────────────
    if let Some(raw) = cli.fetch {
        let key = normalize_location(&raw);
        let (readings, did_fetch) = exit_on_error(resolver.get_or_fetch(&key).await, "Fetch failed");
        info!(
            "{}: {} readings ({})",
            key,
            readings.len(),
            if did_fetch { "fetched from provider" } else { "served from cache" }
        );
        for reading in &readings {
            info!("  {} AQI={} [{:?}]", reading.last_update, reading.aqi, reading.source);
        }
        return;
    }

    if let Some(raw) = cli.record {
        let key = normalize_location(&raw);
        let Some(aqi) = cli.aqi else {
            error!("--record requires --aqi");
            std::process::exit(1);
        };
        let reading = exit_on_error(
            history.record(&key, aqi, cli.timestamp.clone()).await,
            "Record failed",
        );
        info!("Recorded AQI={} for {} at {}", reading.aqi, key, reading.last_update);
        return;
    }

    if let Some(raw) = cli.predict {
        let key = normalize_location(&raw);
        let readings = exit_on_error(
            history.recent(&key, cfg.recent_limit).await,
            "History read failed",
        );
        let forecast = exit_on_error(predict_next_day(&readings), "Prediction failed");
        info!("Predicted AQI for {}: {}", key, forecast);
        return;
    }

    if let Some(raw) = cli.track {
        let user = exit_on_error(
            resolve_identity(&authenticator, cli.token.as_deref()).await,
            "Authentication failed",
        );
        match exit_on_error(tracker.track(&user, &raw).await, "Track failed") {
            TrackOutcome::Added => info!("Now tracking {}", normalize_location(&raw)),
            TrackOutcome::AlreadyTracked => info!("Already tracking {}", normalize_location(&raw)),
        }
        return;
    }

    if let Some(raw) = cli.untrack {
        let user = exit_on_error(
            resolve_identity(&authenticator, cli.token.as_deref()).await,
            "Authentication failed",
        );
        match exit_on_error(tracker.untrack(&user, &raw).await, "Untrack failed") {
            UntrackOutcome::Removed => info!("Stopped tracking {}", normalize_location(&raw)),
            UntrackOutcome::NotTracked => info!("Was not tracking {}", normalize_location(&raw)),
        }
        return;
    }

    if cli.list_tracked {
        let user = exit_on_error(
            resolve_identity(&authenticator, cli.token.as_deref()).await,
            "Authentication failed",
        );
        let views = exit_on_error(tracker.list_tracked(&user).await, "Listing failed");
        info!("{} tracks {} locations", user.uid, views.len());
        for view in &views {
            let latest = view.history.first().map(|r| r.aqi);
            info!(
                "  {} (since {}): latest AQI {:?}, {} readings",
                view.location,
                view.entry.added_at,
                latest,
                view.history.len()
            );
        }
        return;
    }

    if let Some(raw) = cli.flush {
        let key = normalize_location(&raw);
        let user = exit_on_error(
            resolve_identity(&authenticator, cli.token.as_deref()).await,
            "Authentication failed",
        );
        exit_on_error(ensure_admin(&user), "Flush denied");
        let deleted = exit_on_error(history.flush(&key).await, "Flush failed");
        info!("Flushed {} documents for {}", deleted, key);
        return;
    }

    if cli.once {
        let stats = scheduler.refresh_all().await;
        info!("Sweep: {} refreshed, {} failed", stats.refreshed, stats.failed);
        return;
    }

    // ── Daemon mode ──────────────────────────────────────────────────
    info!("Starting refresh scheduler...");
    scheduler.start().await;

    let hb_history = Arc::clone(&history);
    let heartbeat_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match hb_history.all_keys().await {
                Ok(keys) => info!("HEARTBEAT: {} tracked series", keys.len()),
                Err(e) => error!("HEARTBEAT: key enumeration failed: {}", e),
            }
        }
    });

    info!("🌬️  Airwatch is running. Press Ctrl+C to stop.");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        r = heartbeat_handle => {
            error!("Heartbeat task exited: {:?}", r);
        }
    }

    scheduler.stop().await;
    info!("Airwatch shut down.");
}
