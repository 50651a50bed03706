use serde::{Deserialize, Serialize};

/// Radius of a facility marker in pixels
pub const MARKER_RADIUS: u32 = 3;
/// Fill opacity of a facility marker
pub const MARKER_FILL_OPACITY: f64 = 0.7;

/// A WGS84 position, serialized as `[lat, lon]` the way Leaflet expects it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLon(f64, f64);

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self(lat, lon)
    }

    pub const fn lat(&self) -> f64 {
        self.0
    }

    pub const fn lon(&self) -> f64 {
        self.1
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_finite()
            && self.1.is_finite()
            && (-90.0..=90.0).contains(&self.0)
            && (-180.0..=180.0).contains(&self.1)
    }
}

impl From<geo::Point<f64>> for LatLon {
    fn from(point: geo::Point<f64>) -> Self {
        Self(point.y(), point.x())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: LatLon,
    pub color: String,
    pub popup: String,
}

impl Marker {
    /// Marker for a facility of type `tag`, named `name` if the record has one
    pub fn facility(position: LatLon, color: &str, tag: &str, name: Option<&str>) -> Self {
        Self {
            position,
            color: color.to_string(),
            popup: format!("{}: {}", capitalize(tag), name.unwrap_or("Unknown")),
        }
    }
}

/// Everything the browser needs to draw a map: base view plus markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: LatLon,
    pub zoom: f64,
    pub markers: Vec<Marker>,
}

impl MapView {
    pub const fn new(center: LatLon, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            markers: Vec::new(),
        }
    }

    pub fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    /// JSON that is safe to inline into a `<script>` element
    pub fn to_script_json(&self) -> serde_json::Result<String> {
        Ok(serde_json::to_string(self)?.replace("</", "<\\/"))
    }
}

/// Upper-case the first character and lower-case the rest
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
