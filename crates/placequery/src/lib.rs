//! placequery - geospatial query construction for a places data warehouse
//!
//! placequery takes a search geometry (a circle, a polygon, named regions or a
//! route corridor) plus independently toggleable attribute filters, and
//! compiles them into one of six SQL statement shapes. It runs the statement
//! through the warehouse REST API and turns the columnar result back into
//! something a map can render: a count summary, or a layer of colored H3
//! hexagons.
//!
//! # Quick Start
//!
//! ```rust
//! use placequery::{
//!     ApplicationRunState, AppConfigBuilder, CompileRequest, LatLng, QueryCompiler, QueryShape,
//!     StateChange, resolve::{ResolveOutcome, resolve_circle},
//! };
//!
//! let config = AppConfigBuilder::new()
//!     .project_id("my-project")
//!     .location("Canada")
//!     .build()?;
//!
//! let mut state = ApplicationRunState::new(config.defaults);
//! state.apply(StateChange::SetCenter(LatLng::new(45.50, -73.57)))?;
//! state.apply(StateChange::AddPlaceType("cafe".into()))?;
//!
//! let ResolveOutcome::Ready(params) = resolve_circle(state.center(), state.radius_m()) else {
//!     unreachable!("center is set");
//! };
//! let query = QueryCompiler::new(&config.location).compile(&CompileRequest {
//!     params: &params,
//!     filters: state.filters(),
//!     h3_density: state.h3_density(),
//!     function_mode: false,
//!     h3_resolution: state.h3_resolution(),
//!     radius_m: state.radius_m(),
//! });
//! assert_eq!(query.shape, QueryShape::SimpleAggregate);
//! # Ok::<(), placequery::error::PlaceQueryError>(())
//! ```
//!
//! Executing a query end to end goes through [`Orchestrator`], which is
//! generic over the [`providers`] traits so it can be driven by the
//! `reqwest` clients from `placequery-warehouse` or by in-memory fakes.
//!
//! # Escaping
//!
//! Every user-supplied value reaches SQL through [`sql`]: single-quoted
//! literals for region and place-type values, double-quoted literals for
//! brands and JSON arrays, and checked identifiers for column names.

use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod interpret;
pub mod markers;
pub mod orchestrator;
pub mod providers;
pub mod resolve;
pub mod sql;
pub mod state;

pub use catalog::{DatasetKind, DatasetLocation, RegionDataType, RegionField};
pub use compiler::{CompileRequest, CompiledQuery, QueryCompiler, QueryShape, ShapeInputs, classify};
pub use config::{AppConfig, AppConfigBuilder, SearchDefaults};
pub use error::{PlaceQueryError, Result};
pub use filters::{BusinessStatus, FilterSet, OpeningHoursWindow, RatingRange};
pub use geometry::{LatLng, RouteEndpoints, SearchPolygon, Viewport};
pub use interpret::{AggregateSummary, DensityFeature, DensityLayer, color_scale};
pub use orchestrator::{
    Orchestrator, RunDisplay, RunOutcome, RunResult, StatusLevel, StatusLog, StatusSink,
    StatusUpdate, TracingStatus,
};
pub use providers::{
    AccessTokenProvider, Geocoder, PlaceLocator, QueryExecutor, RouteProvider, StaticTokenProvider,
};
pub use resolve::{RegionColumn, ResolveOutcome, SearchParams};
pub use state::{ApplicationRunState, SearchMode, StateChange};

pub use placequery_warehouse as warehouse;

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for placequery.
///
/// Installs a `tracing` fmt subscriber once per process. `RUST_LOG` takes
/// precedence over `level` when set. HTTP client internals are held at
/// `warn`.
///
/// ```rust
/// use tracing::Level;
///
/// placequery::init_logging(Level::INFO)?;
/// # Ok::<(), placequery::error::PlaceQueryError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static ()> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("hyper_util=warn".parse()?)
            .add_directive("reqwest=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}
