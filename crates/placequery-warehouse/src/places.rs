//! Places API place-details shape, fetched with a `location` field mask.

use serde::Deserialize;

use crate::{LatLng, routes::LatLngLiteral};

pub const PLACE_LOCATION_FIELD_MASK: &str = "location";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceDetails {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub location: Option<LatLngLiteral>,
}

impl PlaceDetails {
    pub fn position(&self) -> Option<LatLng> {
        self.location.map(LatLng::from)
    }
}
