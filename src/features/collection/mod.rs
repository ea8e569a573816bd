//! # Collection Stops Feature
//!
//! Garbage-truck catalog, distance helpers and the stop matcher.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Window-first search with nearest fallback
//! - 1.0.0: Catalog feed, nearest and in-window matching

pub mod catalog;
pub mod geo;
pub mod matcher;
pub mod search;

pub use catalog::{Catalog, CatalogError, CatalogSource, CollectionPoint, HttpCatalog, RouteInfo};
pub use geo::{directions_url, format_distance, haversine_m, Coordinate};
pub use matcher::{Candidate, MatchError, Matcher, TimeWindow};
pub use search::StopSearch;
