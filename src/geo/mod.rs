//! Geographic primitives
//!
//! - **bbox**: validated bounding boxes and their polygon rings
//! - **geojson**: the point/polygon feature model used on the wire
//! - **utm**: forward UTM projection for metric output

mod bbox;
pub mod geojson;
pub mod utm;

pub use bbox::BoundingBox;
pub use geojson::{Feature, FeatureCollection, Geometry};
pub use utm::UtmZone;
