//! The collaborators a run talks to, as traits.
//!
//! The orchestrator is generic over these so tests can drive it with
//! in-memory fakes. With the `http` feature the warehouse clients implement
//! them directly.

use std::{future::Future, sync::Mutex};

use placequery_warehouse::{LatLng, QueryTable, RouteGeometry, Viewport};

use crate::error::{PlaceQueryError, Result};

/// Supplies a bearer token for query execution.
pub trait AccessTokenProvider: Send + Sync {
    /// Return the cached token, acquiring one first if there is none.
    fn ensure_access_token(&self) -> impl Future<Output = Result<String>> + Send;

    /// Forget the cached token; the next run must acquire a new one.
    fn revoke(&self);
}

/// Address to viewport lookup.
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the address matched nothing.
    fn geocode(&self, address: &str) -> impl Future<Output = Result<Option<Viewport>>> + Send;
}

/// Driving route between two points, as a WKT line plus its viewport.
pub trait RouteProvider: Send + Sync {
    fn compute_route(
        &self,
        origin: LatLng,
        destination: LatLng,
    ) -> impl Future<Output = Result<RouteGeometry>> + Send;
}

/// Runs one SQL statement and returns the decoded table.
pub trait QueryExecutor: Send + Sync {
    fn execute(
        &self,
        sql: &str,
        access_token: &str,
    ) -> impl Future<Output = Result<QueryTable>> + Send;
}

/// Looks up where a place is, for sample markers.
pub trait PlaceLocator: Send + Sync {
    fn place_location(&self, place_id: &str) -> impl Future<Output = Result<Option<LatLng>>> + Send;
}

/// A token handed in up front, e.g. from `gcloud auth print-access-token`.
///
/// There is no interactive flow behind it: once revoked, every later
/// request fails until a new token is set.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    token: Mutex<Option<String>>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.into());
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.lock().is_ok_and(|slot| slot.is_some())
    }
}

impl AccessTokenProvider for StaticTokenProvider {
    async fn ensure_access_token(&self) -> Result<String> {
        let slot = self
            .token
            .lock()
            .map_err(|_| PlaceQueryError::Authorization("token cache poisoned".into()))?;
        slot.clone()
            .ok_or_else(|| PlaceQueryError::Authorization("No access token available.".into()))
    }

    fn revoke(&self) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
    }
}

#[cfg(feature = "http")]
mod http {
    use placequery_warehouse::{
        GeocodingClient, LatLng, PlacesClient, QueryClient, QueryTable, RouteGeometry,
        RoutesClient, Viewport,
    };

    use super::{Geocoder, PlaceLocator, QueryExecutor, RouteProvider};
    use crate::error::Result;

    impl Geocoder for GeocodingClient {
        async fn geocode(&self, address: &str) -> Result<Option<Viewport>> {
            Ok(Self::geocode(self, address).await?)
        }
    }

    impl RouteProvider for RoutesClient {
        async fn compute_route(&self, origin: LatLng, destination: LatLng) -> Result<RouteGeometry> {
            Ok(Self::compute_route(self, origin, destination).await?)
        }
    }

    impl QueryExecutor for QueryClient {
        async fn execute(&self, sql: &str, access_token: &str) -> Result<QueryTable> {
            Ok(Self::execute(self, sql, access_token).await?)
        }
    }

    impl PlaceLocator for PlacesClient {
        async fn place_location(&self, place_id: &str) -> Result<Option<LatLng>> {
            Ok(Self::place_location(self, place_id).await?)
        }
    }
}
