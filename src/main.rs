#![forbid(unsafe_code)]
pub mod cache;
pub mod catalog;
pub mod config;
pub mod geodata;
pub mod map_view;
pub mod overpass;
pub mod page;
pub mod query_parameters;
pub mod regex_patterns;
pub mod render;
pub mod server;

use crate::config::AppConfig;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    server::run_server(AppConfig::from_env()).await
}

/*
TESTING:

curl -s 'http://localhost:8000/map.json?province=Utrecht&category=healthcare&tags=hospital,pharmacy' | jq '.map.markers | length'

curl -s 'http://localhost:8000/?province=Zeeland&category=school&tag=school&tag=college' > zeeland.html

 */
