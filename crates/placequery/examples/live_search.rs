//! A circle search against the live warehouse
//!
//! Reads `GCP_PROJECT_ID`, `MAPS_API_KEY`, `PLACES_LOCATION` and `DATASET`
//! through [`AppConfigBuilder::from_env`], plus an access token from
//! `GCP_ACCESS_TOKEN` (for example `gcloud auth print-access-token`).
//!
//! ```sh
//! GCP_ACCESS_TOKEN=$(gcloud auth print-access-token) \
//!     cargo run --example live_search -- 45.50 -73.57
//! ```

use anyhow::{Context, Result};
use placequery::{
    AppConfigBuilder, ApplicationRunState, LatLng, Orchestrator, RunDisplay, RunOutcome,
    StateChange, StaticTokenProvider, StatusLog,
    warehouse::{GeocodingClient, QueryClient, RoutesClient, reqwest::Client},
};
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    placequery::init_logging(Level::INFO)?;

    let mut args = std::env::args().skip(1);
    let lat: f64 = args.next().as_deref().unwrap_or("45.50").parse()?;
    let lng: f64 = args.next().as_deref().unwrap_or("-73.57").parse()?;

    let config = AppConfigBuilder::from_env()?.build()?;
    let token = std::env::var("GCP_ACCESS_TOKEN").context("GCP_ACCESS_TOKEN is not set")?;

    let http = Client::new();
    let orchestrator = Orchestrator::new(
        config.clone(),
        StaticTokenProvider::new(token),
        GeocodingClient::new(http.clone(), &config.maps_api_key),
        RoutesClient::new(http.clone(), &config.maps_api_key),
        QueryClient::new(http, &config.project_id, config.max_results),
    );

    let mut state = ApplicationRunState::new(config.defaults);
    state.apply(StateChange::SetCenter(LatLng::new(lat, lng)))?;
    state.apply(StateChange::SetH3Density(true))?;

    let mut status = StatusLog::default();
    let outcome = orchestrator.run_reporting(&mut state, &mut status).await;
    for update in &status.updates {
        println!("[{:?}] {}", update.level, update.message);
    }

    match outcome? {
        RunOutcome::Invalid { message } => println!("Nothing to run: {message}"),
        RunOutcome::Completed(result) => {
            println!("\n{}", result.query.sql);
            match result.display {
                RunDisplay::Summary(summary) => println!("\n{summary}"),
                RunDisplay::Density(layer) => {
                    println!("\n{} cells, busiest has {}", layer.features.len(), layer.max_count);
                    println!("{}", layer.to_feature_collection());
                }
                RunDisplay::NoResults => println!("\n{}", result.message),
            }
        }
    }
    Ok(())
}
