//! In-memory collaborators for driving the orchestrator without a network.
#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use placequery::{
    AccessTokenProvider, AppConfig, AppConfigBuilder, Geocoder, LatLng, Orchestrator,
    PlaceLocator, PlaceQueryError, QueryExecutor, Result, RouteProvider, StaticTokenProvider,
    Viewport,
    warehouse::{QueryTable, RouteGeometry, WarehouseError},
};
use serde_json::{Value, json};

pub fn setup_test_env() {
    let _ = placequery::init_logging(tracing::Level::WARN);
}

pub fn config(location: &str) -> AppConfig {
    AppConfigBuilder::new()
        .project_id("test-project")
        .maps_api_key("test-key")
        .location(location)
        .build()
        .expect("Test config should build")
}

/// Counts token requests on top of a static token.
#[derive(Debug)]
pub struct CountingAuth {
    inner: StaticTokenProvider,
    pub requests: AtomicUsize,
}

impl CountingAuth {
    pub fn new() -> Self {
        Self {
            inner: StaticTokenProvider::new("test-token"),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl AccessTokenProvider for CountingAuth {
    async fn ensure_access_token(&self) -> Result<String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.inner.ensure_access_token().await
    }

    fn revoke(&self) {
        self.inner.revoke();
    }
}

#[derive(Debug, Default)]
pub struct MapGeocoder {
    pub known: HashMap<String, Viewport>,
    pub calls: Mutex<Vec<String>>,
}

impl MapGeocoder {
    pub fn with(mut self, address: &str, low: (f64, f64), high: (f64, f64)) -> Self {
        self.known.insert(
            address.to_string(),
            Viewport::new(LatLng::new(low.0, low.1), LatLng::new(high.0, high.1)),
        );
        self
    }
}

impl Geocoder for MapGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Viewport>> {
        self.calls.lock().unwrap().push(address.to_string());
        Ok(self.known.get(address).copied())
    }
}

#[derive(Debug, Default)]
pub struct FixedRouter {
    pub route: Option<RouteGeometry>,
    pub calls: AtomicUsize,
}

impl RouteProvider for FixedRouter {
    async fn compute_route(&self, _origin: LatLng, _destination: LatLng) -> Result<RouteGeometry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.route
            .clone()
            .ok_or(PlaceQueryError::Warehouse(WarehouseError::NoRoutes))
    }
}

/// Canned warehouse responses, served in order.
pub enum Canned {
    Table(Value),
    Failure { status: u16, message: String },
}

#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<Canned>>,
    pub queries: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(responses: Vec<Canned>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl QueryExecutor for ScriptedExecutor {
    async fn execute(&self, sql: &str, access_token: &str) -> Result<QueryTable> {
        assert_eq!(access_token, "test-token");
        self.queries.lock().unwrap().push(sql.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Canned::Table(json)) => Ok(QueryTable::from_json(&json.to_string())
                .map_err(WarehouseError::from)?),
            Some(Canned::Failure { status, message }) => {
                Err(WarehouseError::Api { status, message }.into())
            }
            None => Err(WarehouseError::MalformedResponse("no canned response".into()).into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MapLocator {
    pub known: HashMap<String, LatLng>,
    pub failing: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl PlaceLocator for MapLocator {
    async fn place_location(&self, place_id: &str) -> Result<Option<LatLng>> {
        self.calls.lock().unwrap().push(place_id.to_string());
        if self.failing.iter().any(|f| f == place_id) {
            return Err(WarehouseError::Api {
                status: 404,
                message: "not found".into(),
            }
            .into());
        }
        Ok(self.known.get(place_id).copied())
    }
}

pub type TestOrchestrator = Orchestrator<CountingAuth, MapGeocoder, FixedRouter, ScriptedExecutor>;

pub fn orchestrator(location: &str, responses: Vec<Canned>) -> TestOrchestrator {
    Orchestrator::new(
        config(location),
        CountingAuth::new(),
        MapGeocoder::default(),
        FixedRouter::default(),
        ScriptedExecutor::new(responses),
    )
}

pub fn count_table(count: u64) -> Canned {
    Canned::Table(json!({
        "schema": {"fields": [{"name": "total_count", "type": "INTEGER"}]},
        "rows": [{"f": [{"v": count.to_string()}]}],
        "totalRows": "1",
        "jobComplete": true
    }))
}
