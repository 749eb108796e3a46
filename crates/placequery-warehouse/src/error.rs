use thiserror::Error;
pub type Result<T> = std::result::Result<T, WarehouseError>;

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("No routes found between the selected origin and destination.")]
    NoRoutes,
    #[error("Geocoding failed with status {status}: {message}")]
    Geocoding { status: String, message: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}
