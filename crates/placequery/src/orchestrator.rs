//! One user-triggered run, end to end.
//!
//! [`Orchestrator::run_reporting`] sequences geometry resolution,
//! authorization, compilation, execution and interpretation, pushing a status
//! line at each phase. Input problems end the run with
//! [`RunOutcome::Invalid`]; network and decoding failures are logged,
//! reported as `Error: ...` and returned. Nothing is retried.
//!
//! A run holds `&mut ApplicationRunState` until it finishes, so a second run
//! cannot start against the same state while one is in flight.

use std::fmt;

use tracing::{error, info, instrument};

use crate::{
    compiler::{CompileRequest, CompiledQuery, QueryCompiler, QueryShape},
    config::AppConfig,
    error::Result,
    interpret::{
        AggregateSummary, DensityFeature, DensityLayer, NO_DENSITY_RESULTS, density_from_arrays,
        density_from_function,
    },
    markers::{MarkerBatch, load_sample_markers},
    providers::{AccessTokenProvider, Geocoder, PlaceLocator, QueryExecutor, RouteProvider},
    resolve::{
        MISSING_CENTER, ResolveOutcome, SearchParams, resolve_circle, resolve_polygon,
        resolve_region, resolve_route,
    },
    state::{ApplicationRunState, SearchMode},
};

pub const STATUS_VALIDATING: &str = "Validating inputs...";
pub const STATUS_GEOCODING: &str = "Geocoding regions...";
pub const STATUS_ROUTING: &str = "Calculating route...";
pub const STATUS_AUTHORIZING: &str = "Checking authorization...";
pub const STATUS_BUILDING: &str = "Building query...";
pub const STATUS_BUILDING_FUNCTION: &str = "Building function query...";
pub const STATUS_EXECUTING: &str = "Executing query...";
pub const STATUS_EXECUTING_FUNCTION: &str = "Executing function...";
pub const STATUS_SUCCESS: &str = "Query successful.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub level: StatusLevel,
    pub message: String,
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Receives status lines as a run progresses.
pub trait StatusSink {
    fn update(&mut self, level: StatusLevel, message: &str);
}

/// Keeps every status line, newest last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLog {
    pub updates: Vec<StatusUpdate>,
}

impl StatusLog {
    pub fn last(&self) -> Option<&StatusUpdate> {
        self.updates.last()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.updates.iter().map(|u| u.message.as_str()).collect()
    }
}

impl StatusSink for StatusLog {
    fn update(&mut self, level: StatusLevel, message: &str) {
        self.updates.push(StatusUpdate {
            level,
            message: message.to_string(),
        });
    }
}

/// Forwards status lines to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn update(&mut self, level: StatusLevel, message: &str) {
        match level {
            StatusLevel::Error => error!(status = message),
            StatusLevel::Info | StatusLevel::Success => info!(status = message),
        }
    }
}

/// What the map should show after a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunDisplay {
    Summary(AggregateSummary),
    Density(DensityLayer),
    /// A density run that produced no cells.
    NoResults,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub query: CompiledQuery,
    pub display: RunDisplay,
    /// Final status line.
    pub message: String,
    /// Area to fit the map to, when the geometry had one.
    pub viewport: Option<crate::geometry::Viewport>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Inputs were incomplete; nothing was sent to the warehouse.
    Invalid { message: String },
    Completed(RunResult),
}

/// Owns the configuration and the collaborators for a session.
#[derive(Debug)]
pub struct Orchestrator<A, G, R, Q> {
    config: AppConfig,
    auth: A,
    geocoder: G,
    router: R,
    executor: Q,
}

impl<A, G, R, Q> Orchestrator<A, G, R, Q>
where
    A: AccessTokenProvider,
    G: Geocoder,
    R: RouteProvider,
    Q: QueryExecutor,
{
    pub const fn new(config: AppConfig, auth: A, geocoder: G, router: R, executor: Q) -> Self {
        Self {
            config,
            auth,
            geocoder,
            router,
            executor,
        }
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub const fn auth(&self) -> &A {
        &self.auth
    }

    pub const fn executor(&self) -> &Q {
        &self.executor
    }

    /// Revoke the cached token; the next run must authorize again.
    pub fn sign_out(&self) {
        self.auth.revoke();
    }

    /// Run with status lines going to `tracing`.
    pub async fn run(&self, state: &mut ApplicationRunState) -> Result<RunOutcome> {
        self.run_reporting(state, &mut TracingStatus).await
    }

    #[instrument(skip_all, fields(mode = %state.mode()))]
    pub async fn run_reporting<S: StatusSink>(
        &self,
        state: &mut ApplicationRunState,
        status: &mut S,
    ) -> Result<RunOutcome> {
        status.update(StatusLevel::Info, STATUS_VALIDATING);
        match self.execute_run(state, status).await {
            Ok(RunOutcome::Invalid { message }) => {
                status.update(StatusLevel::Error, &message);
                Ok(RunOutcome::Invalid { message })
            }
            Ok(RunOutcome::Completed(result)) => {
                let level = if result.display == RunDisplay::NoResults {
                    StatusLevel::Info
                } else {
                    StatusLevel::Success
                };
                status.update(level, &result.message);
                Ok(RunOutcome::Completed(result))
            }
            Err(e) => {
                error!(error = %e, "Query failed");
                status.update(StatusLevel::Error, &format!("Error: {e}"));
                Err(e)
            }
        }
    }

    async fn execute_run<S: StatusSink>(
        &self,
        state: &mut ApplicationRunState,
        status: &mut S,
    ) -> Result<RunOutcome> {
        let function_mode = state.mode().is_function();
        let params = match self.resolve(state, status).await? {
            ResolveOutcome::Ready(params) => params,
            ResolveOutcome::Invalid { message } => return Ok(RunOutcome::Invalid { message }),
        };

        status.update(StatusLevel::Info, STATUS_AUTHORIZING);
        let token = self.auth.ensure_access_token().await?;

        status.update(
            StatusLevel::Info,
            if function_mode {
                STATUS_BUILDING_FUNCTION
            } else {
                STATUS_BUILDING
            },
        );
        let request = CompileRequest {
            params: &params,
            filters: state.filters(),
            h3_density: state.h3_density(),
            function_mode,
            h3_resolution: state.h3_resolution(),
            radius_m: state.radius_m(),
        };
        let query = QueryCompiler::new(&self.config.location).compile(&request);

        status.update(
            StatusLevel::Info,
            if function_mode {
                STATUS_EXECUTING_FUNCTION
            } else {
                STATUS_EXECUTING
            },
        );
        let table = self.executor.execute(&query.sql, &token).await?;
        info!(shape = %query.shape, rows = table.rows.len(), "Query executed");

        let (display, message) = match query.shape {
            QueryShape::H3Density | QueryShape::H3Function => {
                let layer = if query.shape == QueryShape::H3Density {
                    density_from_arrays(&table)?
                } else {
                    density_from_function(&table)?
                };
                match layer {
                    Some(layer) => (RunDisplay::Density(layer), STATUS_SUCCESS.to_string()),
                    None => (RunDisplay::NoResults, NO_DENSITY_RESULTS.to_string()),
                }
            }
            QueryShape::SimpleAggregate
            | QueryShape::MultiTypeBreakdown
            | QueryShape::BrandBreakdown
            | QueryShape::RegionBreakdown => {
                let mut message = STATUS_SUCCESS.to_string();
                if table.is_truncated() {
                    let total = table.total_rows.unwrap_or_default();
                    message.push_str(&format!(
                        " Warning: Displaying {} of {total} total rows.",
                        table.rows.len()
                    ));
                }
                let summary = AggregateSummary::from_table(&table, params.center);
                (RunDisplay::Summary(summary), message)
            }
        };

        state.record_query(query.sql.clone());
        Ok(RunOutcome::Completed(RunResult {
            query,
            display,
            message,
            viewport: params.viewport,
        }))
    }

    async fn resolve<S: StatusSink>(
        &self,
        state: &ApplicationRunState,
        status: &mut S,
    ) -> Result<ResolveOutcome> {
        let outcome = match state.mode() {
            SearchMode::Circle => resolve_circle(state.center(), state.radius_m()),
            SearchMode::H3Function => match state.center() {
                // The function takes the center and radius directly.
                Some(center) => ResolveOutcome::Ready(SearchParams::new("", center)),
                None => ResolveOutcome::invalid(MISSING_CENTER),
            },
            SearchMode::Polygon => resolve_polygon(state.polygon()),
            SearchMode::Region => {
                let has_names =
                    !state.region_input().trim().is_empty() || !state.region_tags().is_empty();
                if state.region_column().is_some() && has_names {
                    status.update(StatusLevel::Info, STATUS_GEOCODING);
                }
                resolve_region(
                    &self.geocoder,
                    state.region_column(),
                    state.region_input(),
                    state.region_tags(),
                    &self.config.location.label,
                )
                .await
            }
            SearchMode::Route => {
                if state.route().both().is_some() {
                    status.update(StatusLevel::Info, STATUS_ROUTING);
                }
                resolve_route(&self.router, state.route(), state.route_buffer_m()).await?
            }
        };
        Ok(outcome)
    }

    /// Load sample markers for a clicked density cell.
    pub async fn load_cell_markers<P: PlaceLocator, S: StatusSink>(
        &self,
        locator: &P,
        feature: &DensityFeature,
        status: &mut S,
    ) -> MarkerBatch {
        let limit = self.config.defaults.marker_limit;
        let count = feature.place_ids.len().min(limit);
        if count == 0 {
            return MarkerBatch::default();
        }
        status.update(
            StatusLevel::Info,
            &format!("Fetching locations for {count} places..."),
        );
        let batch = load_sample_markers(locator, &feature.place_ids, limit).await;
        let mut message = format!("Showing {} sample places.", batch.markers.len());
        if batch.failed > 0 {
            message.push_str(&format!(" {} could not be loaded.", batch.failed));
        }
        status.update(StatusLevel::Success, &message);
        batch
    }
}

