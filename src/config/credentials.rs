//! Upstream API credentials
//!
//! Both keys are read once at startup. A missing or blank key is a startup
//! failure, never a first-request failure.

use super::airscope_config::AirScopeConfig;
use crate::{AirScopeError, Result};
use std::fmt;

/// API keys for the geocoder and the sensor network
#[derive(Clone)]
pub struct Credentials {
    pub geocoder_key: String,
    pub sensors_key: String,
}

impl Credentials {
    pub fn new(geocoder_key: impl Into<String>, sensors_key: impl Into<String>) -> Self {
        Self {
            geocoder_key: geocoder_key.into(),
            sensors_key: sensors_key.into(),
        }
    }

    /// Read both keys from the process environment
    pub fn from_env(config: &AirScopeConfig) -> Result<Self> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Read both keys through an arbitrary lookup function
    pub fn from_lookup<F>(config: &AirScopeConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |name: &str| -> Result<String> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
                _ => Err(AirScopeError::MissingCredential(name.to_string())),
            }
        };

        let geocoder_key = fetch(&config.geocoder.api_key_env)?;
        let sensors_key = fetch(&config.sensors.api_key_env)?;

        tracing::debug!(
            geocoder_env = %config.geocoder.api_key_env,
            sensors_env = %config.sensors.api_key_env,
            "Credentials loaded"
        );

        Ok(Self {
            geocoder_key,
            sensors_key,
        })
    }
}

// Keys must never reach logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("geocoder_key", &"<redacted>")
            .field("sensors_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_both_keys_present() {
        let config = AirScopeConfig::new();
        let vars = env(&[("LOC_IQ_KEY", "geo-123"), ("API_KEY", "pa-456")]);

        let creds = Credentials::from_lookup(&config, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.geocoder_key, "geo-123");
        assert_eq!(creds.sensors_key, "pa-456");
    }

    #[test]
    fn test_missing_key_fails_fast() {
        let config = AirScopeConfig::new();
        let vars = env(&[("LOC_IQ_KEY", "geo-123")]);

        let err = Credentials::from_lookup(&config, |k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, AirScopeError::MissingCredential(ref name) if name == "API_KEY"));
    }

    #[test]
    fn test_blank_key_is_missing() {
        let config = AirScopeConfig::new();
        let vars = env(&[("LOC_IQ_KEY", "  "), ("API_KEY", "pa-456")]);

        let err = Credentials::from_lookup(&config, |k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, AirScopeError::MissingCredential(ref name) if name == "LOC_IQ_KEY"));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let creds = Credentials::new("secret-geo", "secret-pa");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret"));
    }
}
