//! Error types for AirScope
//!
//! Defines the error enum covering every failure mode of the map pipeline.
//! Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Result type alias for AirScope operations
pub type Result<T> = std::result::Result<T, AirScopeError>;

/// Comprehensive error type for AirScope operations
#[derive(Error, Debug)]
pub enum AirScopeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required credential was not present in the environment
    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    /// The geocoder could not resolve the query
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Upstream data did not have the expected shape
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Upstream service failed (non-2xx, error body)
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Interpolation or aggregation was asked to work on zero sensors
    #[error("No sensors available for this location")]
    EmptyTable,

    /// Bounding box violates min < max on an axis
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP transport errors (connect, timeout, decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl AirScopeError {
    /// Whether the failure originated in an upstream service rather than
    /// in the caller's input or our own configuration.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AirScopeError::UpstreamUnavailable(_)
                | AirScopeError::MalformedPayload(_)
                | AirScopeError::Http(_)
        )
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            AirScopeError::Config(_) => "config",
            AirScopeError::MissingCredential(_) => "missing_credential",
            AirScopeError::InvalidLocation(_) => "invalid_location",
            AirScopeError::MalformedPayload(_) => "malformed_payload",
            AirScopeError::UpstreamUnavailable(_) => "upstream_unavailable",
            AirScopeError::EmptyTable => "empty_table",
            AirScopeError::InvalidBoundingBox(_) => "invalid_bbox",
            AirScopeError::Io(_) => "io",
            AirScopeError::Json(_) => "json",
            AirScopeError::Yaml(_) => "yaml",
            AirScopeError::Http(e) if e.is_timeout() => "timeout",
            AirScopeError::Http(_) => "http",
            AirScopeError::Other(_) => "other",
        }
    }
}
