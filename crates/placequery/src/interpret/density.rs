use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoValue};
use h3o::CellIndex;
use placequery_warehouse::{Cell, QueryTable};
use serde_json::json;
use tracing::{debug, warn};

use super::{
    color_scale,
    error::{InterpretError, Result},
};
use crate::geometry::wkt;

pub const NO_DENSITY_RESULTS: &str =
    "Query returned no results. Try a larger search area or different filters.";

/// One hexagon with its count.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityFeature {
    pub h3_index: Option<String>,
    pub count: u64,
    /// Closed `[lng, lat]` ring.
    pub ring: Vec<[f64; 2]>,
    /// Sample places inside the cell (function mode only).
    pub place_ids: Vec<String>,
}

impl DensityFeature {
    pub fn tooltip(&self) -> String {
        if self.place_ids.is_empty() {
            format!("Count: {}", self.count)
        } else {
            format!("Count: {}\nClick to show sample places", self.count)
        }
    }
}

/// All cells of one density result, colored relative to the largest count.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityLayer {
    pub features: Vec<DensityFeature>,
    pub max_count: u64,
}

impl DensityLayer {
    pub fn new(features: Vec<DensityFeature>) -> Self {
        let max_count = features.iter().map(|f| f.count).max().unwrap_or(0);
        Self {
            features,
            max_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn fill_color(&self, feature: &DensityFeature) -> [u8; 4] {
        color_scale(feature.count, self.max_count)
    }

    /// Export as a GeoJSON feature collection with `count`, `fill_color`,
    /// `place_ids` and (when known) `h3_index` properties.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let features = self
            .features
            .iter()
            .map(|cell| {
                let ring = cell.ring.iter().map(|p| p.to_vec()).collect();
                let mut properties = JsonObject::new();
                properties.insert("count".into(), json!(cell.count));
                properties.insert("fill_color".into(), json!(self.fill_color(cell)));
                properties.insert("place_ids".into(), json!(cell.place_ids));
                if let Some(index) = &cell.h3_index {
                    properties.insert("h3_index".into(), json!(index));
                }
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(GeoValue::Polygon(vec![ring]))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

/// Interpret the single-row `indices`/`counts` array result.
///
/// `Ok(None)` when there is nothing to draw: no row, a null or empty index
/// array, or a leading null index. Unparseable cell indices are skipped.
pub fn density_from_arrays(table: &QueryTable) -> Result<Option<DensityLayer>> {
    let Some(row) = table.rows.first() else {
        return Ok(None);
    };
    let indices_col = table.column_index("indices").unwrap_or(0);
    let counts_col = table.column_index("counts").unwrap_or(1);

    let indices = match row.get(indices_col).and_then(Cell::as_array) {
        Some(items) if items.first().is_some_and(|first| !first.is_null()) => items,
        _ => return Ok(None),
    };
    let counts = row
        .get(counts_col)
        .and_then(Cell::as_array)
        .ok_or(InterpretError::MissingColumn("counts"))?;
    if indices.len() != counts.len() {
        return Err(InterpretError::MismatchedArrays {
            indices: indices.len(),
            counts: counts.len(),
        });
    }

    let features: Vec<DensityFeature> = indices
        .iter()
        .zip(counts)
        .filter_map(|(index, count)| {
            let index = index.as_str()?;
            let Ok(cell) = index.parse::<CellIndex>() else {
                warn!(index, "Skipping invalid H3 index");
                return None;
            };
            Some(DensityFeature {
                h3_index: Some(index.to_string()),
                count: count_value(count),
                ring: cell_ring(cell),
                place_ids: Vec::new(),
            })
        })
        .collect();

    debug!(cells = features.len(), "Interpreted density arrays");
    Ok((!features.is_empty()).then(|| DensityLayer::new(features)))
}

/// Interpret the density function's one-row-per-cell result, which carries
/// a WKT polygon, a count and sample place ids per cell.
///
/// Columns are found by name, falling back to the function's documented
/// positions. Rows whose WKT does not parse are skipped.
pub fn density_from_function(table: &QueryTable) -> Result<Option<DensityLayer>> {
    if table.is_empty() {
        return Ok(None);
    }
    let index_col = table.column_index("h3_cell_index").unwrap_or(0);
    let geography_col = table.column_index("geography").unwrap_or(1);
    let count_col = table.column_index("count").unwrap_or(2);
    let ids_col = table.column_index("place_ids").unwrap_or(3);

    let features: Vec<DensityFeature> = table
        .rows
        .iter()
        .filter_map(|row| {
            let text = row.get(geography_col).and_then(Cell::as_str)?;
            let ring = match wkt::parse_polygon_ring(text) {
                Ok(ring) => ring,
                Err(e) => {
                    warn!(error = %e, "Skipping cell with unparseable geography");
                    return None;
                }
            };
            let place_ids = row
                .get(ids_col)
                .and_then(Cell::as_array)
                .map(|ids| {
                    ids.iter()
                        .filter_map(Cell::as_str)
                        .map(ToString::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Some(DensityFeature {
                h3_index: row.get(index_col).and_then(Cell::as_str).map(ToString::to_string),
                count: row.get(count_col).map_or(0, count_value),
                ring,
                place_ids,
            })
        })
        .collect();

    if features.is_empty() && !table.is_empty() {
        warn!(rows = table.rows.len(), "No density rows could be interpreted");
    }
    Ok((!features.is_empty()).then(|| DensityLayer::new(features)))
}

fn count_value(cell: &Cell) -> u64 {
    cell.as_i64().map_or(0, |c| c.max(0) as u64)
}

/// Cell boundary as a closed `[lng, lat]` ring.
fn cell_ring(cell: CellIndex) -> Vec<[f64; 2]> {
    let mut ring: Vec<[f64; 2]> = cell.boundary().iter().map(|v| [v.lng(), v.lat()]).collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    ring
}
