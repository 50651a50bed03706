use once_cell::sync::Lazy;
use regex::Regex;

/// Regex for amenity tag values that can be embedded in an Overpass query as-is
pub static RE_AMENITY_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").expect("Invalid regex pattern"));

/// Regex for marker colors - CSS color names or hex codes
pub static RE_MARKER_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#[0-9A-Fa-f]{3,8}|[a-z]+)$").expect("Invalid regex pattern"));
