//! Query orchestration for "where do I take out the trash".
//!
//! A bounded time window asks the window query first; when it finds nothing,
//! or no window was given, the nearest stops are returned instead.

use chrono::{DateTime, Utc};
use log::debug;

use crate::core::Config;
use crate::features::collection::catalog::CollectionPoint;
use crate::features::collection::matcher::{Candidate, Matcher, TimeWindow};

#[derive(Debug, Clone, Copy)]
pub struct StopSearch {
    matcher: Matcher,
    nearby_radius_m: f64,
    nearest_limit: usize,
}

impl StopSearch {
    pub fn new(matcher: Matcher, nearby_radius_m: f64, nearest_limit: usize) -> Self {
        Self {
            matcher,
            nearby_radius_m,
            nearest_limit,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Matcher::new(config.timezone),
            config.nearby_radius_m,
            config.nearest_limit,
        )
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn search(
        &self,
        lat: f64,
        lng: f64,
        catalog: &[CollectionPoint],
        window: Option<&TimeWindow>,
    ) -> Vec<Candidate> {
        self.search_at(lat, lng, catalog, window, Utc::now())
    }

    pub fn search_at(
        &self,
        lat: f64,
        lng: f64,
        catalog: &[CollectionPoint],
        window: Option<&TimeWindow>,
        now: DateTime<Utc>,
    ) -> Vec<Candidate> {
        if let Some(window) = window.filter(|w| !w.is_unbounded()) {
            let in_window = self.matcher.find_in_window_at(
                lat,
                lng,
                catalog,
                window,
                self.nearby_radius_m,
                now,
            );
            if !in_window.is_empty() {
                return in_window;
            }
            debug!("No stops inside the requested window, falling back to nearest");
        }

        self.matcher
            .find_nearest_at(lat, lng, catalog, self.nearest_limit, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Taipei;

    fn taipei(h: u32, min: u32) -> DateTime<Utc> {
        Taipei
            .with_ymd_and_hms(2024, 5, 1, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn point(name: &str, lat: f64, arrival: &str) -> CollectionPoint {
        CollectionPoint {
            location: name.to_string(),
            vehicle_number: "V1".to_string(),
            arrival_time: arrival.to_string(),
            latitude: lat.to_string(),
            longitude: "121.5".to_string(),
            ..Default::default()
        }
    }

    fn search() -> StopSearch {
        StopSearch::new(Matcher::new(Taipei), 2_000.0, 2)
    }

    fn catalog() -> Vec<CollectionPoint> {
        vec![
            point("close-late", 25.0001, "22:00"),
            point("mid-early", 25.0050, "18:30"),
            point("far-early", 25.1000, "18:15"),
        ]
    }

    #[test]
    fn test_window_results_win_when_present() {
        let window = TimeWindow::new(Some(taipei(18, 0)), Some(taipei(19, 0)));
        let result = search().search_at(25.0, 121.5, &catalog(), Some(&window), taipei(12, 0));
        // far-early is outside the nearby radius
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].stop_name, "mid-early");
    }

    #[test]
    fn test_falls_back_to_nearest_when_window_empty() {
        let window = TimeWindow::new(Some(taipei(6, 0)), Some(taipei(7, 0)));
        let result = search().search_at(25.0, 121.5, &catalog(), Some(&window), taipei(12, 0));
        let names: Vec<_> = result.iter().map(|c| c.stop_name.as_str()).collect();
        assert_eq!(names, ["close-late", "mid-early"]);
    }

    #[test]
    fn test_unbounded_window_means_nearest() {
        let result = search().search_at(
            25.0,
            121.5,
            &catalog(),
            Some(&TimeWindow::unbounded()),
            taipei(12, 0),
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].stop_name, "close-late");

        let no_window = search().search_at(25.0, 121.5, &catalog(), None, taipei(12, 0));
        assert_eq!(no_window, result);
    }
}
