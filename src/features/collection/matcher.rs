//! # Stop Matcher
//!
//! Ranks catalog entries against a user location. Two questions, two orderings:
//! "what is nearest" sorts by distance, "what comes next in this window" sorts
//! by arrival. Both share the per-row resolution: parse the coordinate and the
//! clock time, resolve the clock time to its next occurrence, drop the row if
//! either parse fails.
//!
//! Pure and synchronous. Safe to call from any number of tasks at once.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::debug;
use thiserror::Error;

use crate::core::timezone::{at_time_today, next_occurrence, parse_time_of_day};
use crate::features::collection::catalog::CollectionPoint;
use crate::features::collection::geo::Coordinate;

#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("Invalid clock time: {0}")]
    InvalidClock(String),
}

/// A ranked stop for one query. Built fresh per query and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub stop_name: String,
    pub route_id: String,
    pub route_name: String,
    pub coordinate: Coordinate,
    /// Great-circle distance from the query point
    pub distance_m: f64,
    /// Next arrival, never before the query's `now`
    pub eta: DateTime<Utc>,
}

/// Inclusive arrival window. An unset bound is open on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// Window with neither bound set; matches every instant
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Build a window from optional `HH:MM` readings on today's date in `tz`.
    /// Blank strings count as unset. No day rollover is applied to bounds.
    pub fn from_clock(
        from: Option<&str>,
        to: Option<&str>,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<Self, MatchError> {
        let resolve = |text: Option<&str>| -> Result<Option<DateTime<Utc>>, MatchError> {
            match text.map(str::trim).filter(|t| !t.is_empty()) {
                None => Ok(None),
                Some(t) => parse_time_of_day(t)
                    .and_then(|time| at_time_today(tz, now, time))
                    .map(Some)
                    .ok_or_else(|| MatchError::InvalidClock(t.to_string())),
            }
        };
        Ok(Self {
            from: resolve(from)?,
            to: resolve(to)?,
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        if let Some(from) = self.from {
            if instant < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if instant > to {
                return false;
            }
        }
        true
    }
}

/// Matches catalog rows in one fixed service timezone
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    tz: Tz,
}

impl Matcher {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Nearest stops to the user, closest first. `limit == 0` means no limit.
    pub fn find_nearest(
        &self,
        user_lat: f64,
        user_lng: f64,
        catalog: &[CollectionPoint],
        limit: usize,
    ) -> Vec<Candidate> {
        self.find_nearest_at(user_lat, user_lng, catalog, limit, Utc::now())
    }

    pub fn find_nearest_at(
        &self,
        user_lat: f64,
        user_lng: f64,
        catalog: &[CollectionPoint],
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<Candidate> {
        let origin = Coordinate::new(user_lat, user_lng);
        let mut candidates: Vec<Candidate> = catalog
            .iter()
            .filter_map(|point| self.resolve(&origin, point, now))
            .collect();

        // Stable: equal distances keep catalog order
        candidates.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

        if limit > 0 {
            candidates.truncate(limit);
        }
        candidates
    }

    /// Stops arriving inside `window`, soonest first. Rows farther than
    /// `max_distance_m` are dropped first when it is positive.
    pub fn find_in_window(
        &self,
        user_lat: f64,
        user_lng: f64,
        catalog: &[CollectionPoint],
        window: &TimeWindow,
        max_distance_m: f64,
    ) -> Vec<Candidate> {
        self.find_in_window_at(user_lat, user_lng, catalog, window, max_distance_m, Utc::now())
    }

    pub fn find_in_window_at(
        &self,
        user_lat: f64,
        user_lng: f64,
        catalog: &[CollectionPoint],
        window: &TimeWindow,
        max_distance_m: f64,
        now: DateTime<Utc>,
    ) -> Vec<Candidate> {
        let origin = Coordinate::new(user_lat, user_lng);
        let mut candidates: Vec<Candidate> = catalog
            .iter()
            .filter_map(|point| self.resolve(&origin, point, now))
            .filter(|c| max_distance_m <= 0.0 || c.distance_m <= max_distance_m)
            .filter(|c| window.contains(c.eta))
            .collect();

        candidates.sort_by_key(|c| c.eta);
        candidates
    }

    fn resolve(
        &self,
        origin: &Coordinate,
        point: &CollectionPoint,
        now: DateTime<Utc>,
    ) -> Option<Candidate> {
        let Some(coordinate) = Coordinate::parse(&point.latitude, &point.longitude) else {
            debug!(
                "Skipping {} ({}): bad coordinate {:?},{:?}",
                point.location, point.vehicle_number, point.latitude, point.longitude
            );
            return None;
        };
        let Some(eta) =
            parse_time_of_day(&point.arrival_time).and_then(|t| next_occurrence(self.tz, now, t))
        else {
            debug!(
                "Skipping {} ({}): bad arrival time {:?}",
                point.location, point.vehicle_number, point.arrival_time
            );
            return None;
        };

        Some(Candidate {
            stop_name: point.location.clone(),
            route_id: point.vehicle_number.clone(),
            route_name: point.route.clone(),
            distance_m: origin.distance_to(&coordinate),
            coordinate,
            eta,
        })
    }
}
