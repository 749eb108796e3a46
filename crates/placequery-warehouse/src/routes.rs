//! Routes API shapes and the route-to-WKT conversion.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{LatLng, Viewport, WarehouseError, error::Result};

/// Field mask sent with every `computeRoutes` call; only the line and viewport are needed.
pub const ROUTES_FIELD_MASK: &str = "routes.polyline.geoJsonLinestring,routes.viewport";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub origin: Waypoint,
    pub destination: Waypoint,
    pub travel_mode: &'static str,
    pub routing_preference: &'static str,
    pub polyline_encoding: &'static str,
    pub compute_alternative_routes: bool,
}

impl RouteRequest {
    /// A traffic-aware driving route encoded as a GeoJSON linestring.
    pub fn driving(origin: LatLng, destination: LatLng) -> Self {
        Self {
            origin: Waypoint::at(origin),
            destination: Waypoint::at(destination),
            travel_mode: "DRIVE",
            routing_preference: "TRAFFIC_AWARE",
            polyline_encoding: "GEO_JSON_LINESTRING",
            compute_alternative_routes: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Waypoint {
    pub location: WaypointLocation,
}

impl Waypoint {
    pub const fn at(point: LatLng) -> Self {
        Self {
            location: WaypointLocation {
                lat_lng: LatLngLiteral {
                    latitude: point.lat,
                    longitude: point.lng,
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointLocation {
    pub lat_lng: LatLngLiteral,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatLngLiteral {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

impl From<LatLngLiteral> for LatLng {
    fn from(value: LatLngLiteral) -> Self {
        Self::new(value.latitude, value.longitude)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutesResponse {
    #[serde(default)]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    pub polyline: RoutePolyline,
    pub viewport: RouteViewport,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePolyline {
    pub geo_json_linestring: GeoJsonLineString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoJsonLineString {
    /// `[lng, lat]` pairs.
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RouteViewport {
    pub low: LatLngLiteral,
    pub high: LatLngLiteral,
}

/// A computed route ready to be used as a search corridor.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGeometry {
    /// `LINESTRING(lng lat, ...)`
    pub wkt: String,
    pub path: Vec<LatLng>,
    pub viewport: Viewport,
}

impl RouteGeometry {
    /// Take the first route of a response.
    pub fn from_response(response: &RoutesResponse) -> Result<Self> {
        let route = response.routes.first().ok_or(WarehouseError::NoRoutes)?;
        let coordinates = &route.polyline.geo_json_linestring.coordinates;
        if coordinates.is_empty() {
            return Err(WarehouseError::MalformedResponse(
                "route polyline has no coordinates".to_string(),
            ));
        }
        Ok(Self {
            wkt: linestring_wkt(coordinates),
            path: coordinates.iter().copied().map(LatLng::from_lng_lat).collect(),
            viewport: Viewport::new(route.viewport.low.into(), route.viewport.high.into()),
        })
    }
}

/// Format `[lng, lat]` pairs as `LINESTRING(lng lat, lng lat, ...)`.
pub fn linestring_wkt(coordinates: &[[f64; 2]]) -> String {
    format!(
        "LINESTRING({})",
        coordinates
            .iter()
            .map(|[lng, lat]| format!("{lng} {lat}"))
            .join(", ")
    )
}
