use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaceQueryError {
    #[error("Geometry error: {0}")]
    Geometry(#[from] crate::geometry::GeometryError),
    #[error("Filter error: {0}")]
    Filter(#[from] crate::filters::FilterError),
    #[error("Could not interpret results: {0}")]
    Interpret(#[from] crate::interpret::InterpretError),
    #[error("{0}")]
    Warehouse(#[from] placequery_warehouse::WarehouseError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authorization failed: {0}")]
    Authorization(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PlaceQueryError>;
