//! Coverage-expanding sensor search
//!
//! Resolves a query, fetches sensors inside the box, and widens the box
//! exponentially when nothing is found.

mod controller;

pub use controller::{SearchController, SearchOutcome, EMPTY_COVERAGE_MESSAGE};
