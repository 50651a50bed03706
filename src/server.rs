use crate::cache::MapCache;
use crate::config::AppConfig;
use crate::map_view::MapView;
use crate::overpass::OverpassSource;
use crate::page::Page;
use crate::query_parameters::{MapRequest, QueryParameters};
use crate::render::{COUNTRY_ZOOM, MapRenderer, RenderError, Rendering};
use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{AppendHeaders, Html, IntoResponse},
    routing::get,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

#[derive(Debug, Clone)]
pub struct AppState {
    renderer: MapRenderer,
}

impl AppState {
    pub const fn new(renderer: MapRenderer) -> Self {
        Self { renderer }
    }

    async fn render(
        &self,
        province: &str,
        category: &str,
        tags: &[String],
        purge: bool,
    ) -> Result<Rendering, RenderError> {
        if purge {
            self.renderer.refresh(province, category, tags).await
        } else {
            self.renderer.render(province, category, tags).await
        }
    }
}

#[axum::debug_handler]
async fn main_css() -> impl IntoResponse {
    (
        AppendHeaders([(CONTENT_TYPE, "text/css")]),
        include_str!("../data/main.css"),
    )
}

#[axum::debug_handler]
async fn favicon_ico() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[axum::debug_handler]
async fn index(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Html<String>, StatusCode> {
    let catalog = state.renderer.catalog();
    let query = QueryParameters::from_pairs(&pairs, catalog);

    let html = match state
        .render(&query.province, &query.category, &query.tags, query.purge)
        .await
    {
        Ok(rendering) => Page::new(catalog, &query, &rendering).to_html(),
        Err(error) => {
            tracing::info!("rejected selection {query:?}: {error}");
            let map = MapView::new(catalog.all_center(), COUNTRY_ZOOM);
            Page::failed(catalog, &query, &map, &error).to_html()
        }
    }
    .map_err(|e| {
        tracing::error!("could not build page: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Html(html))
}

#[axum::debug_handler]
async fn map_json(
    State(state): State<AppState>,
    Query(request): Query<MapRequest>,
) -> Result<Json<Rendering>, (StatusCode, String)> {
    let catalog = state.renderer.catalog();
    let tags = request.tags();
    let rendering = state
        .render(
            request.province(catalog, state.renderer.policy()),
            request.category(catalog),
            &tags,
            request.purge(),
        )
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(rendering))
}

#[axum::debug_handler]
async fn catalog_json(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.renderer.catalog().clone())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/index.html", get(index))
        .route("/map.json", get(map_json))
        .route("/catalog.json", get(catalog_json))
        .route("/main.css", get(main_css))
        .route("/favicon.ico", get(favicon_ico))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}

pub async fn run_server(config: AppConfig) -> Result<()> {
    let catalog = Arc::new(config.load_catalog()?);
    let source = Arc::new(OverpassSource::new(
        &config.overpass_url,
        &config.nominatim_url,
        config.timeout,
    )?);
    let renderer = MapRenderer::new(
        catalog,
        source,
        MapCache::default(),
        config.location_policy,
    );
    let app = router(AppState::new(renderer));

    tracing::info!(
        "Starting server on http://{}:{} (Overpass: {})",
        config.address,
        config.port,
        config.overpass_url
    );

    let addr = SocketAddr::from((config.address, config.port));
    tracing::debug!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::geodata::{FetchError, GeoRecord, GeoSource};
    use crate::map_view::LatLon;
    use crate::render::LocationPolicy;
    use async_trait::async_trait;
    use geo::Point;

    struct FixedSource;

    #[async_trait]
    impl GeoSource for FixedSource {
        async fn fetch(&self, _place: &str, tag: &str) -> Result<Vec<GeoRecord>, FetchError> {
            match tag {
                "clinic" => Err(FetchError::UnknownPlace("nowhere".to_string())),
                _ => Ok(vec![GeoRecord::new(
                    Point::new(5.12, 52.09),
                    Some("A".to_string()),
                )]),
            }
        }
    }

    fn state(policy: LocationPolicy) -> AppState {
        AppState::new(MapRenderer::new(
            Arc::new(Catalog::builtin().unwrap()),
            Arc::new(FixedSource),
            MapCache::default(),
            policy,
        ))
    }

    fn pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_index_page() {
        let Html(html) = index(
            State(state(LocationPolicy::Fallback)),
            Query(pairs(&[
                ("province", "Utrecht"),
                ("category", "healthcare"),
                ("tag", "hospital"),
                ("tag", "clinic"),
            ])),
        )
        .await
        .unwrap();
        assert!(html.contains("\"popup\":\"Hospital: A\""));
        assert!(html.contains("Could not fetch data for clinic in Utrecht"));
        assert!(html.contains("Healthcare facilities legend"));
    }

    #[tokio::test]
    async fn test_index_normalizes_unknown_province_even_when_strict() {
        let Html(html) = index(
            State(state(LocationPolicy::Strict)),
            Query(pairs(&[("province", "Atlantis")])),
        )
        .await
        .unwrap();
        assert!(html.contains("<option value=\"All\" selected>All</option>"));
        assert!(!html.contains("class=\"error\""));
    }

    #[tokio::test]
    async fn test_map_json() {
        let Json(rendering) = map_json(
            State(state(LocationPolicy::Fallback)),
            Query(MapRequest {
                province: Some("Utrecht".to_string()),
                category: Some("healthcare".to_string()),
                tags: Some("hospital".to_string()),
                purge: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(rendering.map.zoom, 10.0);
        assert_eq!(rendering.map.markers.len(), 1);
        assert_eq!(rendering.map.markers[0].color, "green");
    }

    #[derive(Default)]
    struct RecordingSource {
        places: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GeoSource for RecordingSource {
        async fn fetch(&self, place: &str, _tag: &str) -> Result<Vec<GeoRecord>, FetchError> {
            self.places.lock().unwrap().push(place.to_string());
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_map_json_unknown_provinces_share_the_country_view() {
        let source = Arc::new(RecordingSource::default());
        let state = AppState::new(MapRenderer::new(
            Arc::new(Catalog::builtin().unwrap()),
            source.clone(),
            MapCache::default(),
            LocationPolicy::Fallback,
        ));
        for province in ["", "x1", "x2", "x3"] {
            let Json(rendering) = map_json(
                State(state.clone()),
                Query(MapRequest {
                    province: Some(province.to_string()),
                    category: Some("healthcare".to_string()),
                    tags: Some("hospital".to_string()),
                    purge: None,
                }),
            )
            .await
            .unwrap();
            assert_eq!(rendering.map.zoom, COUNTRY_ZOOM);
            assert_eq!(rendering.map.center, LatLon::new(52.1326, 5.2913));
        }
        assert_eq!(*source.places.lock().unwrap(), vec!["Netherlands".to_string()]);
    }

    #[tokio::test]
    async fn test_map_json_rejects_bad_selection() {
        let result = map_json(
            State(state(LocationPolicy::Strict)),
            Query(MapRequest {
                province: Some("Atlantis".to_string()),
                ..Default::default()
            }),
        )
        .await;
        let (status, message) = result.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "unknown province \"Atlantis\"");

        let result = map_json(
            State(state(LocationPolicy::Fallback)),
            Query(MapRequest {
                category: Some("school".to_string()),
                tags: Some("hospital".to_string()),
                ..Default::default()
            }),
        )
        .await;
        assert_eq!(result.unwrap_err().0, StatusCode::BAD_REQUEST);
    }
}
