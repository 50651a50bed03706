//! Turns a (location, category, tags) selection into a [`MapView`].
//!
//! Every tag is fetched on its own, one after another. A tag whose fetch
//! fails contributes a [`FetchWarning`] instead of markers and never stops
//! the remaining tags. Finished renderings are memoized in a [`MapCache`].
use crate::cache::{MapCache, MapKey};
use crate::catalog::{ALL_PROVINCES, Catalog, Category};
use crate::geodata::GeoSource;
use crate::map_view::{MapView, Marker, capitalize};
use serde::Serialize;
use std::{fmt, sync::Arc};
use thiserror::Error;

/// Zoom level of the whole-country view
pub const COUNTRY_ZOOM: f64 = 7.5;
/// Zoom level of a single province
pub const PROVINCE_ZOOM: f64 = 10.0;

/// What to do with a location that is not in the province table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocationPolicy {
    /// Center the map on the whole country
    #[default]
    Fallback,
    /// Reject the request
    Strict,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("unknown province {0:?}")]
    UnknownLocation(String),
    #[error("unknown facility category {0:?}")]
    UnknownCategory(String),
    #[error("{tag:?} is not a {category} facility")]
    TagNotInCategory { tag: String, category: String },
}

/// A tag that could not be fetched, shown to the user instead of its markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchWarning {
    pub tag: String,
    pub location: String,
    pub message: String,
}

impl fmt::Display for FetchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Could not fetch data for {} in {}: {}",
            self.tag, self.location, self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendering {
    pub map: MapView,
    pub warnings: Vec<FetchWarning>,
}

#[derive(Clone)]
pub struct MapRenderer {
    catalog: Arc<Catalog>,
    source: Arc<dyn GeoSource>,
    cache: MapCache,
    policy: LocationPolicy,
}

impl fmt::Debug for MapRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapRenderer")
            .field("cache", &self.cache)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl MapRenderer {
    pub fn new(
        catalog: Arc<Catalog>,
        source: Arc<dyn GeoSource>,
        cache: MapCache,
        policy: LocationPolicy,
    ) -> Self {
        Self {
            catalog,
            source,
            cache,
            policy,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub const fn policy(&self) -> LocationPolicy {
        self.policy
    }

    /// Place name handed to the geodata service
    pub fn place_query(&self, location: &str) -> String {
        let country = self.catalog.country();
        if location == ALL_PROVINCES {
            country.to_string()
        } else {
            format!("{location}, {country}")
        }
    }

    /// Empty map centered on `location`
    pub fn base_view(&self, location: &str) -> Result<MapView, RenderError> {
        let center = match self.catalog.province(location) {
            Some(province) => province.center,
            None if self.policy == LocationPolicy::Strict => {
                return Err(RenderError::UnknownLocation(location.to_string()));
            }
            None => self.catalog.all_center(),
        };
        let zoom = if location == ALL_PROVINCES {
            COUNTRY_ZOOM
        } else {
            PROVINCE_ZOOM
        };
        Ok(MapView::new(center, zoom))
    }

    fn check_selection(&self, category: &str, tags: &[String]) -> Result<&Category, RenderError> {
        let category = self
            .catalog
            .category(category)
            .ok_or_else(|| RenderError::UnknownCategory(category.to_string()))?;
        if let Some(tag) = tags.iter().find(|tag| !category.offers(tag)) {
            return Err(RenderError::TagNotInCategory {
                tag: tag.clone(),
                category: category.name.clone(),
            });
        }
        Ok(category)
    }

    /// Render `tags` of `category` around `location`, reusing an earlier
    /// rendering of the exact same arguments if there is one
    pub async fn render(
        &self,
        location: &str,
        category: &str,
        tags: &[String],
    ) -> Result<Rendering, RenderError> {
        let resolved = self.check_selection(category, tags)?;
        let key = MapKey::new(location, category, tags);
        if let Some(rendering) = self.cache.get(&key).await {
            tracing::debug!("cache hit for {key:?}");
            return Ok(rendering);
        }
        let rendering = self.draw(location, resolved, tags).await?;
        Ok(self.cache.insert(key, rendering).await)
    }

    /// Like [`MapRenderer::render`] but always queries, replacing the cached rendering
    pub async fn refresh(
        &self,
        location: &str,
        category: &str,
        tags: &[String],
    ) -> Result<Rendering, RenderError> {
        let resolved = self.check_selection(category, tags)?;
        let rendering = self.draw(location, resolved, tags).await?;
        self.cache
            .replace(MapKey::new(location, category, tags), rendering.clone())
            .await;
        Ok(rendering)
    }

    async fn draw(
        &self,
        location: &str,
        category: &Category,
        tags: &[String],
    ) -> Result<Rendering, RenderError> {
        let place = self.place_query(location);
        let mut map = self.base_view(location)?;
        let mut warnings = Vec::new();

        for tag in tags {
            let records = match self.source.fetch(&place, tag).await {
                Ok(records) => records,
                Err(error) => {
                    let warning = FetchWarning {
                        tag: tag.clone(),
                        location: location.to_string(),
                        message: error.to_string(),
                    };
                    tracing::warn!("{warning}");
                    warnings.push(warning);
                    continue;
                }
            };

            // offered tags always have a color in a validated catalog
            let color = category.color(tag).unwrap_or_default();
            for record in &records {
                let Some(position) = record.representative_point() else {
                    continue;
                };
                map.add_marker(Marker::facility(
                    position,
                    color,
                    tag,
                    record.name.as_deref(),
                ));
            }
        }

        tracing::debug!(
            "rendered {} markers for {} in {location}",
            map.markers.len(),
            capitalize(&category.name)
        );
        Ok(Rendering { map, warnings })
    }
}
