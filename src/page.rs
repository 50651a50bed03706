use crate::catalog::Catalog;
use crate::map_view::{MARKER_FILL_OPACITY, MARKER_RADIUS, MapView, capitalize};
use crate::query_parameters::QueryParameters;
use crate::render::{FetchWarning, RenderError, Rendering};
use aho_corasick::AhoCorasick;
use anyhow::Result;
use html_escape::{encode_double_quoted_attribute, encode_text};

pub const TITLE: &str = "Amenities map in the Netherlands";
/// Width of the map in pixels
pub const MAP_WIDTH: u32 = 700;

const PAGE_TEMPLATE: &str = include_str!("../data/page.html");
const HELP_TEXT: &str = include_str!("../data/help.html");

/// The index page: selectors, help text, warnings, map and legend
#[derive(Debug)]
pub struct Page<'a> {
    catalog: &'a Catalog,
    query: &'a QueryParameters,
    map: &'a MapView,
    warnings: &'a [FetchWarning],
    error: Option<&'a RenderError>,
}

impl<'a> Page<'a> {
    pub fn new(catalog: &'a Catalog, query: &'a QueryParameters, rendering: &'a Rendering) -> Self {
        Self {
            catalog,
            query,
            map: &rendering.map,
            warnings: &rendering.warnings,
            error: None,
        }
    }

    /// Page for a selection that could not be rendered, showing `map` without markers
    pub fn failed(
        catalog: &'a Catalog,
        query: &'a QueryParameters,
        map: &'a MapView,
        error: &'a RenderError,
    ) -> Self {
        Self {
            catalog,
            query,
            map,
            warnings: &[],
            error: Some(error),
        }
    }

    fn option(value: &str, selected: bool) -> String {
        format!(
            "<option value=\"{}\"{}>{}</option>\n",
            encode_double_quoted_attribute(value),
            if selected { " selected" } else { "" },
            encode_text(value)
        )
    }

    fn province_options(&self) -> String {
        self.catalog
            .province_choices()
            .into_iter()
            .map(|name| Self::option(name, name == self.query.province))
            .collect()
    }

    fn category_options(&self) -> String {
        self.catalog
            .categories()
            .iter()
            .map(|c| Self::option(&c.name, c.name == self.query.category))
            .collect()
    }

    fn tag_options(&self) -> (String, usize) {
        let Some(category) = self.catalog.category(&self.query.category) else {
            return (String::new(), 0);
        };
        let html = category
            .tags
            .iter()
            .map(|tag| Self::option(tag, self.query.is_selected(tag)))
            .collect();
        (html, category.tags.len())
    }

    pub fn legend_header(&self) -> String {
        format!("{} facilities legend", capitalize(&self.query.category))
    }

    fn legend(&self) -> String {
        let Some(category) = self.catalog.category(&self.query.category) else {
            return String::new();
        };
        let mut html = String::new();
        for tag in &self.query.tags {
            let color = category.color(tag).unwrap_or_default();
            html.push_str(&format!(
                "<div class=\"legend-item\"><span class=\"swatch\" style=\"background-color: {};\"></span>{}</div>\n",
                encode_double_quoted_attribute(color),
                encode_text(&capitalize(tag))
            ));
        }
        html
    }

    fn messages(&self) -> String {
        let mut html = String::new();
        if let Some(error) = self.error {
            html.push_str(&format!(
                "<div class=\"error\">{}</div>\n",
                encode_text(&error.to_string())
            ));
        }
        for warning in self.warnings {
            html.push_str(&format!(
                "<div class=\"warning\">{}</div>\n",
                encode_text(&warning.to_string())
            ));
        }
        html
    }

    pub fn to_html(&self) -> Result<String> {
        let (tag_options, tag_count) = self.tag_options();
        let replacements: Vec<(&str, String)> = vec![
            ("{{TITLE}}", encode_text(TITLE).to_string()),
            ("{{LEGEND_HEADER}}", encode_text(&self.legend_header()).to_string()),
            ("{{LEGEND}}", self.legend()),
            ("{{PROVINCE_OPTIONS}}", self.province_options()),
            ("{{CATEGORY_OPTIONS}}", self.category_options()),
            ("{{TAG_OPTIONS}}", tag_options),
            ("{{TAG_COUNT}}", tag_count.max(1).to_string()),
            ("{{HELP}}", HELP_TEXT.to_string()),
            ("{{MESSAGES}}", self.messages()),
            ("{{MAP_WIDTH}}", MAP_WIDTH.to_string()),
            ("{{MAP_JSON}}", self.map.to_script_json()?),
            ("{{MARKER_RADIUS}}", MARKER_RADIUS.to_string()),
            ("{{MARKER_FILL_OPACITY}}", MARKER_FILL_OPACITY.to_string()),
        ];
        let (patterns, values): (Vec<&str>, Vec<String>) = replacements.into_iter().unzip();

        let ac = AhoCorasick::new(&patterns)?;
        Ok(ac.replace_all(PAGE_TEMPLATE, &values))
    }
}
