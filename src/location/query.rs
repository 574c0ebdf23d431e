//! Location query classification

use crate::{AirScopeError, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A user's location search: a US ZIP code or a free-text place name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocationQuery {
    /// `NNNNN` or `NNNNN-NNNN`
    PostalCode(String),
    /// Anything else, passed to the geocoder verbatim
    Place(String),
}

impl LocationQuery {
    /// Classify a raw query string. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AirScopeError::InvalidLocation(
                "location query is empty".to_string(),
            ));
        }
        if is_postal_code(trimmed) {
            Ok(LocationQuery::PostalCode(trimmed.to_string()))
        } else {
            Ok(LocationQuery::Place(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LocationQuery::PostalCode(code) => code,
            LocationQuery::Place(place) => place,
        }
    }

    pub fn is_postal_code(&self) -> bool {
        matches!(self, LocationQuery::PostalCode(_))
    }

    /// Five-digit ZIP sent to the geocoder (the +4 suffix is dropped)
    pub fn zip5(&self) -> Option<&str> {
        match self {
            LocationQuery::PostalCode(code) => code.get(..5),
            LocationQuery::Place(_) => None,
        }
    }
}

impl FromStr for LocationQuery {
    type Err = AirScopeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn postal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // ASCII digits only: `\d` alone would also accept full-width numerals
    PATTERN.get_or_init(|| Regex::new(r"^(?-u:\d){5}(-(?-u:\d){4})?$").expect("valid ZIP pattern"))
}

/// Whether `s` is a US ZIP code, `NNNNN` or `NNNNN-NNNN`
pub fn is_postal_code(s: &str) -> bool {
    postal_pattern().is_match(s)
}
