//! Great-circle distance and map helpers

/// Mean Earth radius used for all distance calculations, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Parse a coordinate from the feed's string columns.
    /// Non-numeric or non-finite values yield `None`.
    pub fn parse(lat: &str, lng: &str) -> Option<Self> {
        let lat: f64 = lat.trim().parse().ok()?;
        let lng: f64 = lng.trim().parse().ok()?;
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        Some(Self { lat, lng })
    }

    /// Haversine distance to `other` in meters
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_m(self.lat, self.lng, other.lat, other.lng)
    }
}

pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Human-readable distance, meters below 1 km
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("約{meters:.0}公尺")
    } else {
        format!("約{:.1}公里", meters / 1000.0)
    }
}

/// Map link for navigating to a stop
pub fn directions_url(coord: &Coordinate) -> String {
    format!("https://maps.google.com/?q={:.6},{:.6}", coord.lat, coord.lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero_for_same_point() {
        let p = Coordinate::new(25.0330, 121.5654);
        assert_eq!(p.distance_to(&p), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        // One degree of latitude is R * pi / 180
        let d = haversine_m(25.0, 121.0, 26.0, 121.0);
        let expected = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        assert!((d - expected).abs() < 1e-6, "got {d}, expected {expected}");
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let a = Coordinate::new(25.0478, 121.5170);
        let b = Coordinate::new(25.0330, 121.5654);
        assert!((a.distance_to(&b) - b.distance_to(&a)).abs() < 1e-9);
        // Taipei Main Station to Taipei 101 is roughly 5 km
        let d = a.distance_to(&b);
        assert!(d > 4_500.0 && d < 5_500.0, "got {d}");
    }

    #[test]
    fn test_coordinate_parse() {
        assert_eq!(
            Coordinate::parse(" 25.03 ", "121.56"),
            Some(Coordinate::new(25.03, 121.56))
        );
        assert_eq!(Coordinate::parse("", "121.56"), None);
        assert_eq!(Coordinate::parse("25.03", "east"), None);
        assert_eq!(Coordinate::parse("NaN", "121.56"), None);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(42.4), "約42公尺");
        assert_eq!(format_distance(999.0), "約999公尺");
        assert_eq!(format_distance(1260.0), "約1.3公里");
    }

    #[test]
    fn test_directions_url() {
        let url = directions_url(&Coordinate::new(25.033, 121.5654));
        assert_eq!(url, "https://maps.google.com/?q=25.033000,121.565400");
    }
}
