//! Sensor acquisition
//!
//! - **client**: the sensor network API and its raw positional payload
//! - **fetcher**: per-box memoization of network calls
//! - **table**: typed sensor records decoded from a payload

mod client;
mod fetcher;
mod table;

pub use client::{parse_sensors_body, PurpleAirClient, RawSensorPayload, SensorSource};
pub use fetcher::SensorFetcher;
pub use table::{SensorRecord, SensorTable, SENSOR_FIELDS};
