use crate::catalog::{ALL_PROVINCES, Catalog};
use crate::render::LocationPolicy;
use serde::Deserialize;

/// The URL parameters for the `/map.json` endpoint. Category and tags are
/// taken as given, so unknown values reach the renderer and are reported there.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MapRequest {
    pub province: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub purge: Option<u8>,
}

impl MapRequest {
    /// Blank means "All". Unknown names also become "All", unless `policy`
    /// is strict and the renderer should reject them.
    pub fn province<'a>(&'a self, catalog: &Catalog, policy: LocationPolicy) -> &'a str {
        match self.province.as_deref().map(str::trim) {
            None | Some("") => ALL_PROVINCES,
            Some(name) if catalog.province(name).is_some() => name,
            Some(name) if policy == LocationPolicy::Strict => name,
            Some(_) => ALL_PROVINCES,
        }
    }

    pub fn category<'a>(&'a self, catalog: &'a Catalog) -> &'a str {
        match &self.category {
            Some(category) => category.trim(),
            None => &catalog.default_category().name,
        }
    }

    /// Comma-separated tags in request order, blanks dropped
    pub fn tags(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Purge cache if requested by user
    pub fn purge(&self) -> bool {
        self.purge == Some(1)
    }
}

/// The user's selection, as submitted by the form on the index page.
///
/// Built from raw query pairs because the tag selector submits one `tag`
/// pair per selected tag. Everything is normalized against the catalog, so
/// only values the selectors could have offered survive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParameters {
    pub province: String,
    pub category: String,
    pub tags: Vec<String>,
    pub purge: bool,
}

impl QueryParameters {
    pub fn from_pairs(pairs: &[(String, String)], catalog: &Catalog) -> Self {
        let value = |key: &str| {
            pairs
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.trim())
        };

        let province = match value("province") {
            Some(name) if catalog.province(name).is_some() => name.to_string(),
            _ => ALL_PROVINCES.to_string(),
        };

        let category = value("category")
            .and_then(|name| catalog.category(name))
            .unwrap_or_else(|| catalog.default_category());

        let mut tags: Vec<String> = Vec::new();
        let requested = pairs
            .iter()
            .filter(|(k, _)| k == "tag" || k == "tags")
            .flat_map(|(_, v)| v.split(','))
            .map(str::trim);
        for tag in requested {
            if category.offers(tag) && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        Self {
            province,
            category: category.name.clone(),
            tags,
            purge: value("purge") == Some("1"),
        }
    }

    pub fn is_selected(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
