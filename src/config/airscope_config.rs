//! AirScope configuration file handling
//!
//! Loads and manages the ~/.config/airscope/config.yaml file. Every section is
//! optional; a missing section falls back to the production defaults.

use crate::interpolate::InterpolationPolicy;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Geocoding service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Search endpoint
    #[serde(default = "default_geocoder_url")]
    pub base_url: String,

    /// Value sent in the Referer header
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Environment variable holding the API key
    #[serde(default = "default_geocoder_key_env")]
    pub api_key_env: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_geocoder_url() -> String {
    "https://us1.locationiq.com/v1/search".to_string()
}

fn default_referer() -> String {
    "https://www.kaggle.com/".to_string()
}

fn default_geocoder_key_env() -> String {
    "LOC_IQ_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoder_url(),
            referer: default_referer(),
            api_key_env: default_geocoder_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GeocoderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Sensor network settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorNetworkConfig {
    /// Sensors endpoint
    #[serde(default = "default_sensors_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_sensors_key_env")]
    pub api_key_env: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_sensors_url() -> String {
    "https://api.purpleair.com/v1/sensors/".to_string()
}

fn default_sensors_key_env() -> String {
    "API_KEY".to_string()
}

impl Default for SensorNetworkConfig {
    fn default() -> Self {
        Self {
            base_url: default_sensors_url(),
            api_key_env: default_sensors_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SensorNetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Absolute time-to-live for cached upstream responses
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Upper bound on live entries in each cache
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

fn default_ttl_secs() -> u64 {
    1800
}

fn default_max_entries() -> u64 {
    crate::cache::DEFAULT_MAX_ENTRIES
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Which interpolation policy the map endpoint uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Constant value per cell from the nearest sensor
    Nearest,
    /// Inverse-distance weighted k nearest neighbours
    Knn,
}

/// Interpolation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolationConfig {
    #[serde(default = "default_policy")]
    pub policy: PolicyKind,

    /// Upper bound on neighbours for the k-NN policy
    #[serde(default = "default_k_max")]
    pub k_max: usize,
}

fn default_policy() -> PolicyKind {
    PolicyKind::Knn
}

fn default_k_max() -> usize {
    5
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            k_max: default_k_max(),
        }
    }
}

impl InterpolationConfig {
    /// Resolve the configured policy
    pub fn policy(&self) -> InterpolationPolicy {
        match self.policy {
            PolicyKind::Nearest => InterpolationPolicy::NearestNeighbor,
            PolicyKind::Knn => InterpolationPolicy::WeightedKnn { k_max: self.k_max },
        }
    }
}

/// Search loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Expansion steps after the initial attempt
    #[serde(default = "default_max_expansions")]
    pub max_expansions: u32,
}

fn default_max_expansions() -> u32 {
    3
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_expansions: default_max_expansions(),
        }
    }
}

/// AirScope configuration
///
/// Represents the complete ~/.config/airscope/config.yaml file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AirScopeConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub geocoder: GeocoderConfig,

    #[serde(default)]
    pub sensors: SensorNetworkConfig,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub interpolation: InterpolationConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl AirScopeConfig {
    /// Create a configuration with every default
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default path, falling back to defaults if the file is absent
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(crate::AirScopeError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading AirScope configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            bind = %config.server.bind,
            ttl_secs = config.cache.ttl_secs,
            policy = ?config.interpolation.policy,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "Saving AirScope configuration");

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    /// Get the default config path (~/.config/airscope/config.yaml)
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("airscope");
        path.push("config.yaml");
        path
    }
}
