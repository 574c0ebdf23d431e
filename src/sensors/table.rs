//! Sensor records and the per-request sensor table

use super::client::RawSensorPayload;
use crate::geo::{Feature, FeatureCollection, Geometry, UtmZone};
use crate::{AirScopeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields requested from the sensor network, in row order
pub const SENSOR_FIELDS: [&str; 11] = [
    "sensor_index",
    "name",
    "latitude",
    "longitude",
    "altitude",
    "pm1.0",
    "pm2.5",
    "pm10.0",
    "pm2.5_10minute",
    "pm2.5_30minute",
    "pm2.5_60minute",
];

/// One outdoor sensor and its latest readings
///
/// Serialized with the sensor network's field names so a record doubles as a
/// GeoJSON property bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub sensor_index: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    #[serde(rename = "pm1.0")]
    pub pm1_0: Option<f64>,
    #[serde(rename = "pm2.5")]
    pub pm2_5: Option<f64>,
    #[serde(rename = "pm10.0")]
    pub pm10_0: Option<f64>,
    #[serde(rename = "pm2.5_10minute")]
    pub pm2_5_10minute: Option<f64>,
    #[serde(rename = "pm2.5_30minute")]
    pub pm2_5_30minute: Option<f64>,
    #[serde(rename = "pm2.5_60minute")]
    pub pm2_5_60minute: Option<f64>,
}

impl SensorRecord {
    /// `(longitude, latitude)`
    pub fn position(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    pub fn point(&self) -> Geometry {
        Geometry::point(self.longitude, self.latitude)
    }

    /// Instantaneous PM2.5, NaN when the sensor reported none
    pub fn pm2_5_or_nan(&self) -> f64 {
        self.pm2_5.unwrap_or(f64::NAN)
    }

    fn to_feature(&self, geometry: Geometry) -> Result<Feature> {
        let properties = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            other => {
                return Err(AirScopeError::Other(format!(
                    "sensor record serialized to non-object: {}",
                    other
                )))
            }
        };
        Ok(Feature {
            geometry,
            properties,
        })
    }

    /// Decode one positional row in [`SENSOR_FIELDS`] order
    pub fn from_row(row_index: usize, row: &[Value]) -> Result<Self> {
        if row.len() != SENSOR_FIELDS.len() {
            return Err(AirScopeError::MalformedPayload(format!(
                "row {} has {} fields, expected {}",
                row_index,
                row.len(),
                SENSOR_FIELDS.len()
            )));
        }

        let bad = |field: usize, expected: &str| {
            AirScopeError::MalformedPayload(format!(
                "row {} field {} is {}, expected {}",
                row_index, SENSOR_FIELDS[field], row[field], expected
            ))
        };

        let sensor_index = row[0].as_i64().ok_or_else(|| bad(0, "an integer"))?;
        let name = match &row[1] {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            _ => return Err(bad(1, "a string")),
        };
        let coordinate = |field: usize| {
            row[field]
                .as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| bad(field, "a finite number"))
        };
        let reading = |field: usize| match &row[field] {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_f64()),
            _ => Err(bad(field, "a number or null")),
        };

        Ok(Self {
            sensor_index,
            name,
            latitude: coordinate(2)?,
            longitude: coordinate(3)?,
            altitude: reading(4)?,
            pm1_0: reading(5)?,
            pm2_5: reading(6)?,
            pm10_0: reading(7)?,
            pm2_5_10minute: reading(8)?,
            pm2_5_30minute: reading(9)?,
            pm2_5_60minute: reading(10)?,
        })
    }
}

/// Ordered, read-only collection of sensor records for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorTable {
    records: Vec<SensorRecord>,
}

impl SensorTable {
    pub fn new(records: Vec<SensorRecord>) -> Self {
        Self { records }
    }

    /// Build the table from the raw sensor-network payload
    ///
    /// Rows are read by the `fields` names the network echoes back, in
    /// whatever order it lists them; without `fields` they are taken in
    /// [`SENSOR_FIELDS`] order. A single bad row fails the whole payload
    /// rather than being dropped.
    pub fn from_payload(payload: &RawSensorPayload) -> Result<Self> {
        let records = if payload.fields.is_empty() {
            payload
                .data
                .iter()
                .enumerate()
                .map(|(i, row)| SensorRecord::from_row(i, row))
                .collect::<Result<Vec<_>>>()?
        } else {
            let layout = field_layout(&payload.fields)?;
            payload
                .data
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    if row.len() != payload.fields.len() {
                        return Err(AirScopeError::MalformedPayload(format!(
                            "row {} has {} fields, expected {}",
                            i,
                            row.len(),
                            payload.fields.len()
                        )));
                    }
                    let ordered: Vec<Value> = layout.iter().map(|&col| row[col].clone()).collect();
                    SensorRecord::from_row(i, &ordered)
                })
                .collect::<Result<Vec<_>>>()?
        };

        tracing::debug!(sensors = records.len(), "Built sensor table");
        Ok(Self { records })
    }

    pub fn records(&self) -> &[SensorRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `(longitude, latitude)` of every record, in table order
    pub fn positions(&self) -> Vec<[f64; 2]> {
        self.records.iter().map(SensorRecord::position).collect()
    }

    /// Mean of the reported 60-minute PM2.5 averages, ignoring sensors without one
    pub fn mean_pm2_5_60minute(&self) -> Option<f64> {
        let values: Vec<f64> = self
            .records
            .iter()
            .filter_map(|r| r.pm2_5_60minute)
            .filter(|v| v.is_finite())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    /// Point features in WGS84 with every record attribute as a property
    pub fn to_feature_collection(&self) -> Result<FeatureCollection> {
        let features = self
            .records
            .iter()
            .map(|r| r.to_feature(r.point()))
            .collect::<Result<Vec<_>>>()?;
        Ok(FeatureCollection::new(features))
    }

    /// Point features projected to the UTM zone of the first record
    pub fn to_utm_feature_collection(&self) -> Result<Option<(UtmZone, FeatureCollection)>> {
        let Some(first) = self.records.first() else {
            return Ok(None);
        };
        let zone = UtmZone::for_point(first.longitude, first.latitude);
        let features = self
            .records
            .iter()
            .map(|r| {
                let (easting, northing) = zone.project(r.longitude, r.latitude);
                r.to_feature(Geometry::point(easting, northing))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some((zone, FeatureCollection::new(features))))
    }

    /// Decode point features produced by [`SensorTable::to_feature_collection`]
    pub fn from_feature_collection(collection: &FeatureCollection) -> Result<Self> {
        let records = collection
            .features
            .iter()
            .enumerate()
            .map(|(i, feature)| {
                if !matches!(feature.geometry, Geometry::Point { .. }) {
                    return Err(AirScopeError::MalformedPayload(format!(
                        "feature {} is not a point",
                        i
                    )));
                }
                serde_json::from_value(Value::Object(feature.properties.clone())).map_err(|e| {
                    AirScopeError::MalformedPayload(format!("feature {}: {}", i, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { records })
    }
}

/// Column of each [`SENSOR_FIELDS`] entry within the echoed field list
fn field_layout(fields: &[String]) -> Result<Vec<usize>> {
    SENSOR_FIELDS
        .iter()
        .map(|name| {
            fields.iter().position(|f| f == name).ok_or_else(|| {
                AirScopeError::MalformedPayload(format!(
                    "field {} missing from layout {}",
                    name,
                    fields.join(",")
                ))
            })
        })
        .collect()
}
