//! Cache keys built from call arguments

use std::collections::BTreeMap;
use std::fmt;

/// Reproducible encoding of a cached call's arguments
///
/// Arguments are named and sorted by name, so the order in which they are
/// added does not matter. Values are encoded with their `Debug`
/// representation: strings are quoted and escaped, floats print with
/// round-trip precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Start a key for the given operation namespace
    pub fn builder(namespace: impl Into<String>) -> CacheKeyBuilder {
        CacheKeyBuilder {
            namespace: namespace.into(),
            args: BTreeMap::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builder for [`CacheKey`]
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    namespace: String,
    args: BTreeMap<String, String>,
}

impl CacheKeyBuilder {
    /// Add a named argument. Re-adding a name replaces the earlier value.
    pub fn arg(mut self, name: impl Into<String>, value: impl fmt::Debug) -> Self {
        self.args.insert(name.into(), format!("{:?}", value));
        self
    }

    pub fn build(self) -> CacheKey {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        CacheKey(format!("{}({})", self.namespace, args.join(",")))
    }
}
