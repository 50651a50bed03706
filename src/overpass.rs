//! [`GeoSource`] backed by the public OpenStreetMap services.
//!
//! A place name is resolved to an OSM area through Nominatim, then every
//! element with the requested `amenity` tag inside that area is fetched from
//! the Overpass interpreter with full geometry (`out geom`).
use crate::geodata::{FetchError, GeoRecord, GeoSource};
use anyhow::Result;
use async_trait::async_trait;
use geo::{Geometry, GeometryCollection, LineString, Point, Polygon};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;

const HTTP_USER_AGENT: &str = "AmenityMap/0.1";
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Overpass derives area ids from the id of the closed way or relation
const WAY_AREA_OFFSET: u64 = 2_400_000_000;
const RELATION_AREA_OFFSET: u64 = 3_600_000_000;

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    osm_type: String,
    osm_id: u64,
}

impl NominatimPlace {
    fn area_id(&self) -> Option<u64> {
        match self.osm_type.as_str() {
            "relation" => Some(RELATION_AREA_OFFSET + self.osm_id),
            "way" => Some(WAY_AREA_OFFSET + self.osm_id),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
    remark: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct OverpassCoord {
    lat: f64,
    lon: f64,
}

impl From<OverpassCoord> for geo::Coord<f64> {
    fn from(c: OverpassCoord) -> Self {
        geo::Coord { x: c.lon, y: c.lat }
    }
}

#[derive(Debug, Deserialize)]
struct OverpassMember {
    lat: Option<f64>,
    lon: Option<f64>,
    geometry: Option<Vec<Option<OverpassCoord>>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OverpassElement {
    Node {
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Way {
        #[serde(default)]
        geometry: Vec<Option<OverpassCoord>>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Relation {
        #[serde(default)]
        members: Vec<OverpassMember>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    #[serde(other)]
    Other,
}

/// A closed ring of at least four points is an area, anything else a line
fn way_geometry(coords: &[Option<OverpassCoord>]) -> Option<Geometry<f64>> {
    let coords: Vec<geo::Coord<f64>> = coords.iter().flatten().map(|c| (*c).into()).collect();
    if coords.is_empty() {
        None
    } else if coords.len() == 1 {
        Some(Point::from(coords[0]).into())
    } else if coords.len() >= 4 && coords.first() == coords.last() {
        Some(Polygon::new(LineString::new(coords), vec![]).into())
    } else {
        Some(LineString::new(coords).into())
    }
}

impl OverpassElement {
    fn into_record(self) -> Option<GeoRecord> {
        let (geometry, mut tags): (Geometry<f64>, HashMap<String, String>) = match self {
            Self::Node { lat, lon, tags } => (Point::new(lon, lat).into(), tags),
            Self::Way { geometry, tags } => (way_geometry(&geometry)?, tags),
            Self::Relation { members, tags } => {
                let parts: Vec<Geometry<f64>> = members
                    .iter()
                    .filter_map(|m| match (&m.geometry, m.lat, m.lon) {
                        (Some(geometry), _, _) => way_geometry(geometry),
                        (None, Some(lat), Some(lon)) => Some(Point::new(lon, lat).into()),
                        _ => None,
                    })
                    .collect();
                if parts.is_empty() {
                    return None;
                }
                (Geometry::GeometryCollection(GeometryCollection(parts)), tags)
            }
            Self::Other => return None,
        };
        Some(GeoRecord::new(geometry, tags.remove("name")))
    }
}

impl OverpassResponse {
    fn into_records(self) -> Result<Vec<GeoRecord>, FetchError> {
        if let Some(remark) = self.remark
            && remark.contains("error")
        {
            return Err(FetchError::Service(remark));
        }
        let total = self.elements.len();
        let records: Vec<GeoRecord> = self
            .elements
            .into_iter()
            .filter_map(OverpassElement::into_record)
            .collect();
        if records.len() < total {
            tracing::debug!("skipped {} elements without geometry", total - records.len());
        }
        Ok(records)
    }
}

#[derive(Debug, Clone)]
pub struct OverpassSource {
    client: reqwest::Client,
    overpass_url: String,
    nominatim_url: String,
    timeout: Duration,
    areas: Arc<RwLock<HashMap<String, u64>>>,
}

impl OverpassSource {
    pub fn new(overpass_url: &str, nominatim_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .timeout(timeout.saturating_add(Duration::from_secs(10)))
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(HTTP_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            overpass_url: overpass_url.to_string(),
            nominatim_url: nominatim_url.trim_end_matches('/').to_string(),
            timeout,
            areas: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    fn build_query(area_id: u64, tag: &str, timeout: Duration) -> String {
        format!(
            "[out:json][timeout:{}];area(id:{area_id})->.searchArea;nwr[\"amenity\"=\"{tag}\"](area.searchArea);out geom;",
            timeout.as_secs()
        )
    }

    async fn area_id(&self, place: &str) -> Result<u64, FetchError> {
        if let Some(area_id) = self.areas.read().await.get(place) {
            return Ok(*area_id);
        }
        let area_id = self.lookup_area(place).await?;
        self.areas.write().await.insert(place.to_string(), area_id);
        Ok(area_id)
    }

    async fn lookup_area(&self, place: &str) -> Result<u64, FetchError> {
        let url = format!(
            "{}/search?q={}&format=json&limit=5",
            self.nominatim_url,
            urlencoding::encode(place)
        );
        let places: Vec<NominatimPlace> = self.send(self.client.get(&url), &url).await?;
        let area_id = places
            .iter()
            .find_map(NominatimPlace::area_id)
            .ok_or_else(|| FetchError::UnknownPlace(place.to_string()))?;
        tracing::debug!("resolved {place:?} to area {area_id}");
        Ok(area_id)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<T, FetchError> {
        let response = request.send().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        let text = response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl GeoSource for OverpassSource {
    async fn fetch(&self, place: &str, tag: &str) -> Result<Vec<GeoRecord>, FetchError> {
        let area_id = self.area_id(place).await?;
        let query = Self::build_query(area_id, tag, self.timeout);
        let request = self
            .client
            .post(&self.overpass_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(format!("data={}", urlencoding::encode(&query)));
        let response: OverpassResponse = self.send(request, &self.overpass_url).await?;
        let records = response.into_records()?;
        tracing::info!("fetched {} {tag} records in {place}", records.len());
        Ok(records)
    }
}
