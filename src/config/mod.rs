//! Configuration system
//!
//! Loads ~/.config/airscope/config.yaml with support for:
//! - Server bind address
//! - Geocoder and sensor-network endpoints, timeouts, key variable names
//! - Response cache TTL
//! - Interpolation policy selection
//!
//! Credentials never live in the file; they are read from the environment
//! variables the file names.

mod airscope_config;
mod credentials;
pub mod validation;

pub use airscope_config::{
    AirScopeConfig, CacheSettings, GeocoderConfig, InterpolationConfig, PolicyKind, SearchConfig,
    SensorNetworkConfig, ServerConfig,
};
pub use credentials::Credentials;
pub use validation::{validate_config, validate_config_result, ValidationError};
