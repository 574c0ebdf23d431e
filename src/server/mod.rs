//! HTTP surface for the map pipeline
//!
//! # Routes
//!
//! - `GET /health` - Liveness check
//! - `GET /points/{location}` - Interpolated PM2.5 map for a place or ZIP code
//! - `GET /average/{location}` - Mean 60-minute PM2.5 over the unexpanded box
//! - `GET /sensors/{location}?projection=wgs84|utm` - Raw sensor points
//! - `GET /metrics` - Prometheus text exposition
//!
//! Unresolvable locations answer `400 {"error": ...}`. A search that finds no
//! sensors answers `200` with the largest box tried, so clients can draw it.

mod handlers;

use crate::cache::TtlCache;
use crate::config::{AirScopeConfig, Credentials};
use crate::interpolate::InterpolationPolicy;
use crate::location::{Geocoder, LocationIqClient, LocationResolver};
use crate::search::SearchController;
use crate::sensors::{PurpleAirClient, SensorFetcher, SensorSource};
use crate::{AirScopeError, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;

pub use handlers::ErrorResponse;

/// Shared request state: the search pipeline and the interpolation policy
pub struct AppState {
    pub search: SearchController,
    pub policy: InterpolationPolicy,
}

impl AppState {
    /// Wire the production upstream clients
    pub fn from_config(config: &AirScopeConfig, credentials: &Credentials) -> Result<Self> {
        let geocoder = LocationIqClient::new(&config.geocoder, credentials.geocoder_key.clone())?;
        let sensors = PurpleAirClient::new(&config.sensors, credentials.sensors_key.clone())?;
        Ok(Self::with_sources(Arc::new(geocoder), Arc::new(sensors), config))
    }

    /// Wire arbitrary upstream implementations behind fresh caches
    pub fn with_sources(
        geocoder: Arc<dyn Geocoder>,
        sensors: Arc<dyn SensorSource>,
        config: &AirScopeConfig,
    ) -> Self {
        let (ttl, max_entries) = (config.cache.ttl(), config.cache.max_entries);
        let resolver = LocationResolver::new(
            geocoder,
            Arc::new(TtlCache::with_capacity("geocode", ttl, max_entries)),
        );
        let fetcher = SensorFetcher::new(
            sensors,
            Arc::new(TtlCache::with_capacity("sensors", ttl, max_entries)),
        );

        Self {
            search: SearchController::new(
                Arc::new(resolver),
                Arc::new(fetcher),
                config.search.max_expansions,
            ),
            policy: config.interpolation.policy(),
        }
    }
}

/// HTTP server for the map service
pub struct MapServer {
    state: Arc<AppState>,
}

impl MapServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Build the router
    pub fn router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/points/{location}", get(handlers::get_points))
            .route("/average/{location}", get(handlers::get_average))
            .route("/sensors/{location}", get(handlers::get_sensors))
            .route("/metrics", get(handlers::get_metrics))
            .with_state(state)
    }

    /// Run the server on the given address
    pub async fn run(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AirScopeError::Config(format!("Cannot bind {}: {}", addr, e)))?;

        tracing::info!(
            addr = addr,
            policy = self.state.policy.name(),
            max_expansions = self.state.search.max_expansions(),
            "Map server listening"
        );

        axum::serve(listener, Self::router(self.state)).await?;
        Ok(())
    }
}
