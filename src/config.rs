use crate::catalog::Catalog;
use crate::overpass::{DEFAULT_NOMINATIM_URL, DEFAULT_OVERPASS_URL};
use crate::render::LocationPolicy;
use anyhow::{Context, Result};
use std::{env, net::Ipv4Addr, time::Duration};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Server settings, read from `AMENITY_MAP_*` environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub address: Ipv4Addr,
    pub port: u16,
    pub overpass_url: String,
    pub nominatim_url: String,
    pub timeout: Duration,
    pub location_policy: LocationPolicy,
    pub catalog_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            address: Ipv4Addr::UNSPECIFIED,
            port: DEFAULT_PORT,
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            location_policy: LocationPolicy::Fallback,
            catalog_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable values fall back to their defaults
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let location_policy = match get("AMENITY_MAP_STRICT_LOCATIONS").as_deref() {
            Some("1" | "true" | "yes") => LocationPolicy::Strict,
            _ => LocationPolicy::Fallback,
        };
        Self {
            address: get("AMENITY_MAP_ADDRESS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.address),
            port: get("AMENITY_MAP_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            overpass_url: get("AMENITY_MAP_OVERPASS_URL").unwrap_or(defaults.overpass_url),
            nominatim_url: get("AMENITY_MAP_NOMINATIM_URL").unwrap_or(defaults.nominatim_url),
            timeout: get("AMENITY_MAP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            location_policy,
            catalog_path: get("AMENITY_MAP_CATALOG"),
        }
    }

    /// The built-in catalog, or the one at `catalog_path`. Either way validated.
    pub fn load_catalog(&self) -> Result<Catalog> {
        let Some(path) = &self.catalog_path else {
            return Ok(Catalog::builtin()?);
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read catalog {path}"))?;
        Catalog::from_json(&json).with_context(|| format!("Invalid catalog {path}"))
    }
}
