//! Geocoding API response shapes. Only the first result's viewport is consumed.

use serde::Deserialize;

use crate::{LatLng, Viewport, WarehouseError, error::Result};

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub formatted_address: Option<String>,
    pub geometry: GeocodeGeometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeGeometry {
    pub location: LatLngPair,
    #[serde(default)]
    pub viewport: Option<GeocodeViewport>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLngPair {
    pub lat: f64,
    pub lng: f64,
}

impl From<LatLngPair> for LatLng {
    fn from(value: LatLngPair) -> Self {
        Self::new(value.lat, value.lng)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GeocodeViewport {
    pub northeast: LatLngPair,
    pub southwest: LatLngPair,
}

impl GeocodeResponse {
    /// Viewport of the best match.
    ///
    /// `ZERO_RESULTS` is a valid empty answer; any other non-`OK` status is an error.
    /// A result without a viewport falls back to its point location.
    pub fn first_viewport(&self) -> Result<Option<Viewport>> {
        match self.status.as_str() {
            "OK" => Ok(self.results.first().map(|result| {
                result.geometry.viewport.map_or_else(
                    || Viewport::from_point(result.geometry.location.into()),
                    |vp| Viewport::new(vp.southwest.into(), vp.northeast.into()),
                )
            })),
            "ZERO_RESULTS" => Ok(None),
            status => Err(WarehouseError::Geocoding {
                status: status.to_string(),
                message: self.error_message.clone().unwrap_or_default(),
            }),
        }
    }
}
