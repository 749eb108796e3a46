//! Wire formats and HTTP clients for the services placequery talks to.
//!
//! The core `placequery` crate never touches raw JSON. Everything that crosses
//! the network boundary is decoded here into plain typed values:
//!
//! - [`wire`]: the warehouse's columnar `rows[].f[].v` result encoding,
//!   normalized into a [`QueryTable`] of [`Cell`]s.
//! - [`routes`]: Routes API request/response shapes and the
//!   GeoJSON-linestring to WKT `LINESTRING` conversion.
//! - [`geocoding`] and [`places`]: the small slices of the Geocoding and
//!   Places APIs that are consumed (a viewport and a location).
//! - [`client`] (feature `http`, on by default): `reqwest` clients for all
//!   four services.

pub mod error;
pub mod geo;
pub mod geocoding;
pub mod places;
pub mod routes;
pub mod wire;

#[cfg(feature = "http")]
pub mod client;

pub use error::{Result, WarehouseError};
pub use geo::{LatLng, Viewport};
pub use routes::{RouteGeometry, linestring_wkt};
pub use wire::{Cell, QueryRequest, QueryResponse, QueryTable};

#[cfg(feature = "http")]
pub use client::{GeocodingClient, PlacesClient, QueryClient, RoutesClient};
#[cfg(feature = "http")]
pub use reqwest;

/// Base URL of the warehouse REST API (`jobs.query` lives under `projects/{id}/queries`).
pub const QUERY_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
/// Routes API `computeRoutes` endpoint.
pub const ROUTES_API_URL: &str = "https://routes.googleapis.com/directions/v2:computeRoutes";
/// Geocoding API JSON endpoint.
pub const GEOCODING_API_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
/// Places API (new) base URL; place details live under `places/{id}`.
pub const PLACES_API_BASE: &str = "https://places.googleapis.com/v1";
