//! # Collection Catalog
//!
//! Typed projection of the public garbage-truck feed plus the HTTP source
//! that fetches it. Rows are kept as the feed delivers them; coordinates and
//! clock times are parsed by the matcher so one bad row never fails a fetch.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: District, route and point lookups
//! - 1.0.0: Feed types and HTTP source

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Catalog feed returned status {0}")]
    Status(u16),

    #[error("Catalog feed could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One scheduled stop of one truck, as published by the feed.
/// Unknown feed columns are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CollectionPoint {
    #[serde(rename = "行政區", default)]
    pub district: String,
    #[serde(rename = "里別", default)]
    pub neighborhood: String,
    #[serde(rename = "車號", default)]
    pub vehicle_number: String,
    #[serde(rename = "路線", default)]
    pub route: String,
    #[serde(rename = "車次", default)]
    pub trip: String,
    /// Wall-clock arrival, `HH:MM` or `HHMM`
    #[serde(rename = "抵達時間", default)]
    pub arrival_time: String,
    #[serde(rename = "離開時間", default)]
    pub departure_time: String,
    #[serde(rename = "地點", default)]
    pub location: String,
    #[serde(rename = "經度", default)]
    pub longitude: String,
    #[serde(rename = "緯度", default)]
    pub latitude: String,
}

#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    result: FeedResult,
}

#[derive(Debug, Deserialize)]
struct FeedResult {
    #[serde(default)]
    results: Vec<CollectionPoint>,
}

/// A route as shown to users: the truck id and its display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub id: String,
    pub name: String,
}

/// The full set of collection points from one fetch
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    points: Vec<CollectionPoint>,
}

impl Catalog {
    pub fn new(points: Vec<CollectionPoint>) -> Self {
        Self { points }
    }

    /// Decode the feed's JSON envelope
    pub fn from_feed_json(body: &str) -> Result<Self, CatalogError> {
        let envelope: FeedEnvelope = serde_json::from_str(body)?;
        Ok(Self::new(envelope.result.results))
    }

    pub fn points(&self) -> &[CollectionPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in the named district. Matches either way round, so a full
    /// address like "台北市信義區" selects rows tagged "信義區".
    /// An empty name keeps everything.
    pub fn in_district(&self, district: &str) -> Catalog {
        let district = district.trim();
        if district.is_empty() {
            return self.clone();
        }
        Catalog::new(
            self.points
                .iter()
                .filter(|p| {
                    !p.district.is_empty()
                        && (p.district.contains(district) || district.contains(&p.district))
                })
                .cloned()
                .collect(),
        )
    }

    /// Route served by the truck with this vehicle number
    pub fn route_by_id(&self, vehicle_number: &str) -> Option<RouteInfo> {
        self.points
            .iter()
            .find(|p| p.vehicle_number == vehicle_number)
            .map(|p| RouteInfo {
                id: p.vehicle_number.clone(),
                name: p.route.clone(),
            })
    }

    /// The stop a given truck makes at a given location
    pub fn point_for(&self, vehicle_number: &str, location: &str) -> Option<&CollectionPoint> {
        self.points
            .iter()
            .find(|p| p.vehicle_number == vehicle_number && p.location == location)
    }
}

/// Where catalogs come from
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Catalog, CatalogError>;
}

/// Fetches the catalog over HTTP on every call
pub struct HttpCatalog {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalog {
    pub fn new(url: impl Into<String>) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    async fn fetch_catalog(&self) -> Result<Catalog, CatalogError> {
        debug!("Fetching collection catalog from {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let catalog = Catalog::from_feed_json(&body)?;
        info!("Fetched {} collection points", catalog.len());
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"{
        "result": {
            "count": 2,
            "limit": 2,
            "offset": 0,
            "sort": "",
            "results": [
                {
                    "_id": 1,
                    "_importdate": {"date": "2024-05-01 00:00:00", "timezone_type": 3, "timezone": "Asia/Taipei"},
                    "行政區": "大安區",
                    "里別": "龍安里",
                    "分隊": "第一分隊",
                    "局編": "1001",
                    "車號": "KAA-001",
                    "路線": "大安一線",
                    "車次": "1",
                    "抵達時間": "19:00",
                    "離開時間": "19:05",
                    "地點": "新生南路一段1號",
                    "經度": "121.5330",
                    "緯度": "25.0330"
                },
                {
                    "_id": 2,
                    "行政區": "信義區",
                    "車號": "KAB-002",
                    "路線": "信義二線",
                    "抵達時間": "2030",
                    "地點": "松仁路100號",
                    "經度": "",
                    "緯度": "25.0400"
                }
            ]
        }
    }"#;

    #[test]
    fn test_decode_feed_ignores_unknown_columns() {
        let catalog = Catalog::from_feed_json(FEED).unwrap();
        assert_eq!(catalog.len(), 2);

        let first = &catalog.points()[0];
        assert_eq!(first.district, "大安區");
        assert_eq!(first.vehicle_number, "KAA-001");
        assert_eq!(first.arrival_time, "19:00");
        assert_eq!(first.latitude, "25.0330");

        // Missing columns default to empty strings
        let second = &catalog.points()[1];
        assert_eq!(second.neighborhood, "");
        assert_eq!(second.longitude, "");
    }

    #[test]
    fn test_decode_rejects_non_feed_json() {
        assert!(matches!(
            Catalog::from_feed_json("[]"),
            Err(CatalogError::Decode(_))
        ));
    }

    #[test]
    fn test_in_district() {
        let catalog = Catalog::from_feed_json(FEED).unwrap();
        assert_eq!(catalog.in_district("信義").len(), 1);
        assert_eq!(catalog.in_district("台北市信義區").len(), 1);
        assert_eq!(catalog.in_district("").len(), 2);
        assert!(catalog.in_district("北投區").is_empty());
    }

    #[test]
    fn test_route_and_point_lookup() {
        let catalog = Catalog::from_feed_json(FEED).unwrap();
        let route = catalog.route_by_id("KAB-002").unwrap();
        assert_eq!(route.name, "信義二線");
        assert!(catalog.route_by_id("nope").is_none());

        let point = catalog.point_for("KAA-001", "新生南路一段1號").unwrap();
        assert_eq!(point.route, "大安一線");
        assert!(catalog.point_for("KAA-001", "松仁路100號").is_none());
    }
}
