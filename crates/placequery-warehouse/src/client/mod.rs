//! `reqwest` clients for the four remote services.
//!
//! Each client owns a cheap-to-clone [`reqwest::Client`] and an overridable base
//! URL. None of them retry: a failed call surfaces its error and the caller
//! decides what to do.

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument, warn};

use crate::{
    GEOCODING_API_URL, LatLng, PLACES_API_BASE, QUERY_API_BASE, ROUTES_API_URL, Viewport,
    WarehouseError,
    error::Result,
    geocoding::GeocodeResponse,
    places::{PLACE_LOCATION_FIELD_MASK, PlaceDetails},
    routes::{ROUTES_FIELD_MASK, RouteGeometry, RouteRequest, RoutesResponse},
    wire::{ApiErrorBody, QueryRequest, QueryResponse, QueryTable},
};

const API_KEY_HEADER: &str = "X-Goog-Api-Key";
const FIELD_MASK_HEADER: &str = "X-Goog-FieldMask";

/// Read a non-2xx body and turn it into [`WarehouseError::Api`], preferring
/// the server's `error.message`.
async fn api_error(response: Response, fallback: &str) -> WarehouseError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| fallback.to_string());
    warn!(status = status.as_u16(), %message, "API request failed");
    WarehouseError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Executes standard-SQL queries through the warehouse's synchronous `jobs.query` endpoint.
#[derive(Debug, Clone)]
pub struct QueryClient {
    client: Client,
    base_url: String,
    project_id: String,
    max_results: u32,
}

impl QueryClient {
    pub fn new(client: Client, project_id: impl Into<String>, max_results: u32) -> Self {
        Self {
            client,
            base_url: QUERY_API_BASE.to_string(),
            project_id: project_id.into(),
            max_results,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/projects/{}/queries",
            self.base_url.trim_end_matches('/'),
            self.project_id
        )
    }

    #[instrument(name = "Execute query", skip_all, fields(query_len = sql.len()), level = "info")]
    pub async fn execute(&self, sql: &str, access_token: &str) -> Result<QueryTable> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(access_token)
            .json(&QueryRequest::standard_sql(sql, self.max_results))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response, "API request failed.").await);
        }

        let body: QueryResponse = response.json().await?;
        let table = QueryTable::from_response(&body);
        debug!(
            rows = table.rows.len(),
            total_rows = ?table.total_rows,
            "Query response decoded"
        );
        Ok(table)
    }
}

/// Computes driving routes and returns them as WKT corridors.
#[derive(Debug, Clone)]
pub struct RoutesClient {
    client: Client,
    url: String,
    api_key: String,
}

impl RoutesClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: ROUTES_API_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[instrument(name = "Compute route", skip(self), level = "info")]
    pub async fn compute_route(&self, origin: LatLng, destination: LatLng) -> Result<RouteGeometry> {
        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(FIELD_MASK_HEADER, ROUTES_FIELD_MASK)
            .json(&RouteRequest::driving(origin, destination))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(match api_error(response, status.as_str()).await {
                WarehouseError::Api { status, message } => WarehouseError::Api {
                    status,
                    message: format!("Routes API request failed: {message}"),
                },
                other => other,
            });
        }

        let body: RoutesResponse = response.json().await?;
        let route = RouteGeometry::from_response(&body)?;
        debug!(vertices = route.path.len(), "Route computed");
        Ok(route)
    }
}

/// Resolves free-text addresses to viewports.
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: Client,
    url: String,
    api_key: String,
}

impl GeocodingClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: GEOCODING_API_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[instrument(name = "Geocode", skip(self), level = "debug")]
    pub async fn geocode(&self, address: &str) -> Result<Option<Viewport>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body: GeocodeResponse = response.json().await?;
        body.first_viewport()
    }
}

/// Looks up single places by id. Only the location is requested.
#[derive(Debug, Clone)]
pub struct PlacesClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PlacesClient {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: PLACES_API_BASE.to_string(),
            api_key: api_key.into(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[instrument(name = "Fetch place location", skip(self), level = "debug")]
    pub async fn place_location(&self, place_id: &str) -> Result<Option<LatLng>> {
        let url = format!("{}/places/{place_id}", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(FIELD_MASK_HEADER, PLACE_LOCATION_FIELD_MASK)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let details: PlaceDetails = response.json().await?;
                Ok(details.position())
            }
            _ => Err(api_error(response, "Place details request failed.").await),
        }
    }
}
