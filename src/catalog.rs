//! Province centers and the facility taxonomy.
//!
//! Both tables are read once at startup from JSON and validated before the
//! server accepts a request. A catalog that passed [`Catalog::from_json`] is
//! guaranteed to have an "All" province and a color for every offered tag.
use crate::map_view::LatLon;
use crate::regex_patterns::{RE_AMENITY_TAG, RE_MARKER_COLOR};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Name of the sentinel province that stands for the whole country
pub const ALL_PROVINCES: &str = "All";

const DEFAULT_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog has no \"All\" province")]
    MissingAllProvince,
    #[error("province {0:?} is listed more than once")]
    DuplicateProvince(String),
    #[error("province {name:?} has an out-of-range center {center:?}")]
    InvalidCenter { name: String, center: LatLon },
    #[error("catalog has no facility categories")]
    NoCategories,
    #[error("category {0:?} is listed more than once")]
    DuplicateCategory(String),
    #[error("category {category:?} offers tag {tag:?} without a color")]
    MissingColor { category: String, tag: String },
    #[error("category {category:?} has an invalid tag {tag:?}")]
    InvalidTag { category: String, tag: String },
    #[error("category {category:?} has an invalid color {color:?} for tag {tag:?}")]
    InvalidColor {
        category: String,
        tag: String,
        color: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Province {
    pub name: String,
    pub center: LatLon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub tags: Vec<String>,
    pub colors: HashMap<String, String>,
}

impl Category {
    pub fn offers(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Color configured for `tag`. Present for every offered tag of a validated catalog.
    pub fn color(&self, tag: &str) -> Option<&str> {
        self.colors.get(tag).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    country: String,
    provinces: Vec<Province>,
    categories: Vec<Category>,
}

impl Catalog {
    /// Parse and validate a catalog
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog compiled into the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(DEFAULT_CATALOG)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for province in &self.provinces {
            if !seen.insert(province.name.as_str()) {
                return Err(CatalogError::DuplicateProvince(province.name.clone()));
            }
            if !province.center.is_valid() {
                return Err(CatalogError::InvalidCenter {
                    name: province.name.clone(),
                    center: province.center,
                });
            }
        }
        if !seen.contains(ALL_PROVINCES) {
            return Err(CatalogError::MissingAllProvince);
        }

        if self.categories.is_empty() {
            return Err(CatalogError::NoCategories);
        }
        let mut seen = HashSet::new();
        for category in &self.categories {
            if !seen.insert(category.name.as_str()) {
                return Err(CatalogError::DuplicateCategory(category.name.clone()));
            }
            for tag in &category.tags {
                if !RE_AMENITY_TAG.is_match(tag) {
                    return Err(CatalogError::InvalidTag {
                        category: category.name.clone(),
                        tag: tag.clone(),
                    });
                }
                let Some(color) = category.color(tag) else {
                    return Err(CatalogError::MissingColor {
                        category: category.name.clone(),
                        tag: tag.clone(),
                    });
                };
                if !RE_MARKER_COLOR.is_match(color) {
                    return Err(CatalogError::InvalidColor {
                        category: category.name.clone(),
                        tag: tag.clone(),
                        color: color.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn provinces(&self) -> &[Province] {
        &self.provinces
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn province(&self, name: &str) -> Option<&Province> {
        self.provinces.iter().find(|p| p.name == name)
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// The category selected when none (or an unknown one) is requested
    pub fn default_category(&self) -> &Category {
        // validate() rejects catalogs without categories
        &self.categories[0]
    }

    /// Center of the whole-country view
    pub fn all_center(&self) -> LatLon {
        self.province(ALL_PROVINCES)
            .map(|p| p.center)
            .unwrap_or_default()
    }

    /// Province names in selector order: "All" first, then the rest of the table
    pub fn province_choices(&self) -> Vec<&str> {
        std::iter::once(ALL_PROVINCES)
            .chain(
                self.provinces
                    .iter()
                    .map(|p| p.name.as_str())
                    .filter(|name| *name != ALL_PROVINCES),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_json(categories: &str) -> String {
        format!(
            r#"{{
                "country": "Netherlands",
                "provinces": [
                    {{ "name": "Utrecht", "center": [52.0907, 5.1214] }},
                    {{ "name": "All", "center": [52.1326, 5.2913] }}
                ],
                "categories": {categories}
            }}"#
        )
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.country(), "Netherlands");
        assert_eq!(catalog.provinces().len(), 13);
        assert_eq!(catalog.default_category().name, "school");
        let healthcare = catalog.category("healthcare").unwrap();
        assert_eq!(healthcare.color("hospital"), Some("green"));
        assert_eq!(
            catalog.province("Zeeland").unwrap().center,
            LatLon::new(51.4940, 3.8497)
        );
        assert_eq!(catalog.all_center(), LatLon::new(52.1326, 5.2913));
    }

    #[test]
    fn test_province_choices_lists_all_once_and_first() {
        let catalog = Catalog::builtin().unwrap();
        let choices = catalog.province_choices();
        assert_eq!(choices[0], "All");
        assert_eq!(choices.iter().filter(|c| **c == "All").count(), 1);
        assert_eq!(choices.len(), 13);
        assert_eq!(choices[1], "Drenthe");
    }

    #[test]
    fn test_missing_color() {
        let json = catalog_json(
            r#"[{ "name": "healthcare", "tags": ["hospital", "clinic"], "colors": { "hospital": "green" } }]"#,
        );
        match Catalog::from_json(&json) {
            Err(CatalogError::MissingColor { category, tag }) => {
                assert_eq!(category, "healthcare");
                assert_eq!(tag, "clinic");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_colors_need_not_be_unique() {
        let json = catalog_json(
            r#"[{ "name": "healthcare", "tags": ["hospital", "clinic"], "colors": { "hospital": "green", "clinic": "green" } }]"#,
        );
        assert!(Catalog::from_json(&json).is_ok());
    }

    #[test]
    fn test_invalid_tag() {
        let json = catalog_json(
            r#"[{ "name": "healthcare", "tags": ["field hospital"], "colors": { "field hospital": "green" } }]"#,
        );
        assert!(matches!(
            Catalog::from_json(&json),
            Err(CatalogError::InvalidTag { .. })
        ));
    }

    #[test]
    fn test_invalid_color() {
        let json = catalog_json(
            r#"[{ "name": "healthcare", "tags": ["hospital"], "colors": { "hospital": "red;<script>" } }]"#,
        );
        assert!(matches!(
            Catalog::from_json(&json),
            Err(CatalogError::InvalidColor { .. })
        ));
    }

    #[test]
    fn test_no_categories() {
        let json = catalog_json("[]");
        assert!(matches!(
            Catalog::from_json(&json),
            Err(CatalogError::NoCategories)
        ));
    }

    #[test]
    fn test_missing_all_province() {
        let json = r#"{
            "country": "Netherlands",
            "provinces": [{ "name": "Utrecht", "center": [52.0907, 5.1214] }],
            "categories": [{ "name": "school", "tags": [], "colors": {} }]
        }"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(CatalogError::MissingAllProvince)
        ));
    }

    #[test]
    fn test_duplicate_province() {
        let json = r#"{
            "country": "Netherlands",
            "provinces": [
                { "name": "All", "center": [52.1326, 5.2913] },
                { "name": "All", "center": [52.1326, 5.2913] }
            ],
            "categories": [{ "name": "school", "tags": [], "colors": {} }]
        }"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(CatalogError::DuplicateProvince(_))
        ));
    }

    #[test]
    fn test_invalid_center() {
        let json = r#"{
            "country": "Netherlands",
            "provinces": [{ "name": "All", "center": [152.1, 5.2] }],
            "categories": [{ "name": "school", "tags": [], "colors": {} }]
        }"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(CatalogError::InvalidCenter { .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Catalog::from_json("{"),
            Err(CatalogError::Parse(_))
        ));
    }
}
