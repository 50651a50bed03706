//! The seam between rendering and wherever facility geometries come from.
use async_trait::async_trait;
use geo::{Centroid, Geometry};
use thiserror::Error;

use crate::map_view::LatLon;

/// Why a single (place, tag) lookup produced no records
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("no area found for place {0:?}")]
    UnknownPlace(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("service error: {0}")]
    Service(String),
}

/// One facility as returned by the geodata service
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRecord {
    pub geometry: Geometry<f64>,
    pub name: Option<String>,
}

impl GeoRecord {
    pub fn new(geometry: impl Into<Geometry<f64>>, name: Option<String>) -> Self {
        Self {
            geometry: geometry.into(),
            name,
        }
    }

    /// The point itself, or the centroid of anything with an extent.
    /// `None` for geometries without coordinates.
    pub fn representative_point(&self) -> Option<LatLon> {
        match &self.geometry {
            Geometry::Point(point) => Some((*point).into()),
            geometry => geometry.centroid().map(LatLon::from),
        }
    }
}

#[async_trait]
pub trait GeoSource: Send + Sync {
    /// All records tagged `amenity=<tag>` within `place` (e.g. "Utrecht, Netherlands")
    async fn fetch(&self, place: &str, tag: &str) -> Result<Vec<GeoRecord>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, GeometryCollection, LineString, Point, Polygon, polygon};

    #[test]
    fn test_point_is_its_own_representative() {
        let record = GeoRecord::new(Point::new(5.1214, 52.0907), Some("A".to_string()));
        assert_eq!(
            record.representative_point(),
            Some(LatLon::new(52.0907, 5.1214))
        );
    }

    #[test]
    fn test_polygon_uses_centroid() {
        let square: Polygon<f64> = polygon![
            (x: 5.0, y: 52.0),
            (x: 6.0, y: 52.0),
            (x: 6.0, y: 53.0),
            (x: 5.0, y: 53.0),
            (x: 5.0, y: 52.0),
        ];
        let point = GeoRecord::new(square, None).representative_point().unwrap();
        assert!((point.lat() - 52.5).abs() < 1e-9);
        assert!((point.lon() - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_line_uses_centroid() {
        let line = LineString::from(vec![(4.0, 51.0), (6.0, 51.0)]);
        let point = GeoRecord::new(line, None).representative_point().unwrap();
        assert!((point.lat() - 51.0).abs() < 1e-9);
        assert!((point.lon() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_geometry_has_no_point() {
        let record = GeoRecord::new(
            Geometry::GeometryCollection(GeometryCollection::<f64>(vec![])),
            None,
        );
        assert_eq!(record.representative_point(), None);
    }
}
