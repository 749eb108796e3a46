//! On-demand sample markers for a clicked density cell.

use tracing::{debug, instrument, warn};

use crate::{
    geometry::{LatLng, Viewport},
    providers::PlaceLocator,
};

/// Most place ids fetched for one cell.
pub const SAMPLE_MARKER_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleMarker {
    pub place_id: String,
    pub position: LatLng,
}

/// Outcome of one marker load. Failures and places without a location are
/// counted, never fatal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerBatch {
    pub markers: Vec<SampleMarker>,
    pub requested: usize,
    pub failed: usize,
    pub without_location: usize,
}

impl MarkerBatch {
    pub fn bounds(&self) -> Option<Viewport> {
        Viewport::from_points(self.markers.iter().map(|m| m.position))
    }
}

/// Fetch locations for up to `limit` of `place_ids`, one at a time.
#[instrument(skip(locator, place_ids), fields(ids = place_ids.len()))]
pub async fn load_sample_markers<P: PlaceLocator>(
    locator: &P,
    place_ids: &[String],
    limit: usize,
) -> MarkerBatch {
    let subset = &place_ids[..place_ids.len().min(limit)];
    let mut batch = MarkerBatch {
        requested: subset.len(),
        ..MarkerBatch::default()
    };

    for id in subset {
        match locator.place_location(id).await {
            Ok(Some(position)) => batch.markers.push(SampleMarker {
                place_id: id.clone(),
                position,
            }),
            Ok(None) => batch.without_location += 1,
            Err(e) => {
                warn!(place_id = %id, error = %e, "Failed to fetch place location");
                batch.failed += 1;
            }
        }
    }

    debug!(
        loaded = batch.markers.len(),
        failed = batch.failed,
        "Sample markers loaded"
    );
    batch
}
