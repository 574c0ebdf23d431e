//! Location resolution
//!
//! Turns a free-text place or US ZIP code into a bounding box suitable for a
//! sensor search:
//!
//! 1. **query**: classify the input (postal code vs. place name)
//! 2. **client**: ask the geocoder for the first match's bounding box
//! 3. **resolver**: pad the box (exponentially per expansion factor, plus a
//!    flat pad for ZIP codes) and memoize the result

mod client;
mod query;
mod resolver;

pub use client::{parse_geocode_body, GeocodeOutcome, Geocoder, LocationIqClient};
pub use query::{is_postal_code, LocationQuery};
pub use resolver::{
    expansion_pad, padded_bounds, ErrorPayload, LocationResolver, Resolution, BASE_PAD_DEGREES,
    INVALID_LOCATION_MESSAGE, POSTAL_PAD_DEGREES,
};
