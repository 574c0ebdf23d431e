//! Search controller: resolve → fetch → expand

use crate::geo::{BoundingBox, Geometry};
use crate::location::{ErrorPayload, LocationQuery, LocationResolver, Resolution};
use crate::metrics;
use crate::sensors::{RawSensorPayload, SensorFetcher, SensorTable};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Message sent alongside the final box when no sensors were found
pub const EMPTY_COVERAGE_MESSAGE: &str = "no outdoor sensors found near this location";

/// What a search produced
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Sensors were found; `expanded` is set when the box had to grow
    Found { table: SensorTable, expanded: bool },
    /// No sensors even in the largest box tried
    Empty { bbox: BoundingBox, polygon: Geometry },
    /// The geocoder could not place the query
    Invalid(ErrorPayload),
}

impl SearchOutcome {
    fn label(&self) -> &'static str {
        match self {
            SearchOutcome::Found {
                expanded: false, ..
            } => "found",
            SearchOutcome::Found { expanded: true, .. } => "expanded",
            SearchOutcome::Empty { .. } => "empty",
            SearchOutcome::Invalid(_) => "invalid",
        }
    }
}

/// Drives the resolve/fetch loop for one query
///
/// Factor 0 succeeds on any sensor at all. Each expansion step doubles the
/// padding and stops early only once more than one sensor is in the box, so
/// a lone sensor found while expanding keeps the search growing.
pub struct SearchController {
    resolver: Arc<LocationResolver>,
    fetcher: Arc<SensorFetcher>,
    max_expansions: u32,
}

impl SearchController {
    pub fn new(
        resolver: Arc<LocationResolver>,
        fetcher: Arc<SensorFetcher>,
        max_expansions: u32,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            max_expansions,
        }
    }

    pub fn max_expansions(&self) -> u32 {
        self.max_expansions
    }

    /// Search around `query`, widening the box up to `max_expansions` times
    pub async fn search(&self, query: &LocationQuery) -> Result<SearchOutcome> {
        let outcome = self.run(query).await?;
        metrics::record_search_outcome(outcome.label());
        Ok(outcome)
    }

    /// Fetch sensors in the unexpanded box only
    ///
    /// Returns `Ok(None)` for an unresolvable query.
    pub async fn search_unexpanded(&self, query: &LocationQuery) -> Result<Option<SensorTable>> {
        let bbox = match self.resolver.resolve(query, 0).await? {
            Resolution::Resolved(bbox) => bbox,
            Resolution::Invalid(_) => return Ok(None),
        };
        let payload = self.fetcher.fetch(&bbox).await?;
        SensorTable::from_payload(&payload).map(Some)
    }

    async fn run(&self, query: &LocationQuery) -> Result<SearchOutcome> {
        let mut bbox = match self.resolver.resolve(query, 0).await? {
            Resolution::Resolved(bbox) => bbox,
            Resolution::Invalid(payload) => return Ok(SearchOutcome::Invalid(payload)),
        };
        let mut payload: Arc<RawSensorPayload> = self.fetcher.fetch(&bbox).await?;
        debug!(query = %query, sensors = payload.len(), "Initial sensor fetch");

        if !payload.is_empty() {
            return Ok(SearchOutcome::Found {
                table: SensorTable::from_payload(&payload)?,
                expanded: false,
            });
        }

        for factor in 1..=self.max_expansions {
            bbox = match self.resolver.resolve(query, factor).await? {
                Resolution::Resolved(bbox) => bbox,
                Resolution::Invalid(payload) => return Ok(SearchOutcome::Invalid(payload)),
            };
            payload = self.fetcher.fetch(&bbox).await?;
            metrics::record_search_expansion(factor);
            info!(
                query = %query,
                factor,
                sensors = payload.len(),
                "Expanded sensor search"
            );

            if payload.len() > 1 {
                break;
            }
        }

        if payload.is_empty() {
            info!(query = %query, bbox = ?bbox, "No sensor coverage");
            return Ok(SearchOutcome::Empty {
                bbox,
                polygon: bbox.to_polygon(),
            });
        }

        Ok(SearchOutcome::Found {
            table: SensorTable::from_payload(&payload)?,
            expanded: true,
        })
    }
}
