//! AirScope - air-quality maps from outdoor PM2.5 sensors
//!
//! Resolves a place name or US ZIP code to a bounding box, fetches outdoor
//! sensor readings inside it (widening the box when coverage is sparse), and
//! interpolates PM2.5 onto a polygon grid served as GeoJSON.
//!
//! # Architecture
//!
//! - **config**: YAML configuration, credentials, validation
//! - **cache**: in-memory TTL cache for upstream responses
//! - **geo**: bounding boxes, GeoJSON features, UTM projection
//! - **location**: query classification, geocoder client, resolver
//! - **sensors**: sensor network client, cached fetcher, sensor table
//! - **search**: coverage-expanding search loop
//! - **interpolate**: nearest-neighbour and weighted k-NN grids
//! - **server**: axum HTTP surface
//! - **metrics**: Prometheus counters and histograms

// Core modules
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

// Pipeline
pub mod cache;
pub mod geo;
pub mod interpolate;
pub mod location;
pub mod search;
pub mod sensors;
pub mod server;

// Re-exports
pub use error::{AirScopeError, Result};
