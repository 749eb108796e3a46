//! Search geometries held in the run state: a drawn or pasted polygon, and the
//! endpoints of a route corridor. Circles are just a center plus a radius and
//! live directly on the state.

pub use error::GeometryError;
use error::Result;
pub use placequery_warehouse::{LatLng, Viewport};

pub mod wkt;

/// Minimum distinct vertices for a drawn polygon.
pub const MIN_DRAWN_VERTICES: usize = 3;
/// Minimum coordinates for a pasted WKT ring, closing vertex included.
pub const MIN_WKT_COORDINATES: usize = 4;

/// An editable polygon search area.
///
/// Vertices are kept exactly as supplied; a pasted closed ring keeps its
/// closing vertex, a drawn open ring does not. [`SearchPolygon::to_wkt`]
/// closes the ring on output either way.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPolygon {
    vertices: Vec<LatLng>,
}

impl SearchPolygon {
    /// Build from vertices clicked on the map.
    pub fn from_vertices(vertices: Vec<LatLng>) -> Result<Self> {
        if vertices.len() < MIN_DRAWN_VERTICES {
            return Err(GeometryError::TooFewVertices {
                required: MIN_DRAWN_VERTICES,
                found: vertices.len(),
            });
        }
        if let Some(bad) = vertices.iter().find(|v| !v.is_finite()) {
            return Err(GeometryError::InvalidCoordinate(bad.to_string()));
        }
        Ok(Self { vertices })
    }

    /// Build from pasted WKT text.
    pub fn from_wkt(text: &str) -> Result<Self> {
        let ring = wkt::parse_polygon_ring(text)?;
        if ring.len() < MIN_WKT_COORDINATES {
            return Err(GeometryError::TooFewVertices {
                required: MIN_WKT_COORDINATES,
                found: ring.len(),
            });
        }
        Ok(Self {
            vertices: ring.into_iter().map(LatLng::from_lng_lat).collect(),
        })
    }

    pub fn vertices(&self) -> &[LatLng] {
        &self.vertices
    }

    /// The vertices with the ring explicitly closed.
    pub fn ring(&self) -> Vec<LatLng> {
        wkt::close_ring(&self.vertices)
    }

    /// First vertex, used as the anchor for result summaries.
    pub fn anchor(&self) -> LatLng {
        self.vertices[0]
    }

    pub fn to_wkt(&self) -> String {
        wkt::polygon_wkt(&self.vertices)
    }

    /// Replace one vertex after an edit on the map.
    pub fn set_vertex(&mut self, index: usize, position: LatLng) -> Result<()> {
        let len = self.vertices.len();
        let slot = self
            .vertices
            .get_mut(index)
            .ok_or(GeometryError::VertexOutOfRange { index, len })?;
        *slot = position;
        Ok(())
    }

    /// Insert a vertex after an edit on the map.
    pub fn insert_vertex(&mut self, index: usize, position: LatLng) -> Result<()> {
        let len = self.vertices.len();
        if index > len {
            return Err(GeometryError::VertexOutOfRange { index, len });
        }
        self.vertices.insert(index, position);
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        // Construction guarantees at least three vertices.
        Viewport::from_points(self.vertices.iter().copied())
            .unwrap_or_else(|| Viewport::from_point(self.anchor()))
    }
}

/// Origin and destination of a route corridor search. Either may be unset
/// while the user is still picking.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RouteEndpoints {
    pub origin: Option<LatLng>,
    pub destination: Option<LatLng>,
}

impl RouteEndpoints {
    pub fn both(&self) -> Option<(LatLng, LatLng)> {
        self.origin.zip(self.destination)
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum GeometryError {
        #[error("Invalid WKT polygon: {0}")]
        InvalidWkt(String),
        #[error("Invalid coordinate: '{0}'")]
        InvalidCoordinate(String),
        #[error("Polygon needs at least {required} vertices, found {found}")]
        TooFewVertices { required: usize, found: usize },
        #[error("Vertex index {index} out of range for ring of {len}")]
        VertexOutOfRange { index: usize, len: usize },
    }
    pub type Result<T> = std::result::Result<T, GeometryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pasted_closed_ring_keeps_four_vertices() {
        let polygon = SearchPolygon::from_wkt("POLYGON((-1 51, -1 52, 0 52, -1 51))").unwrap();
        assert_eq!(polygon.vertices().len(), 4);
        assert_eq!(polygon.vertices()[0], polygon.vertices()[3]);
        assert_eq!(polygon.anchor(), LatLng::new(51.0, -1.0));
        assert_eq!(polygon.to_wkt(), "POLYGON((-1 51, -1 52, 0 52, -1 51))");
    }

    #[test]
    fn test_pasted_ring_needs_four_coordinates() {
        let err = SearchPolygon::from_wkt("POLYGON((-1 51, -1 52, -1 51))").unwrap_err();
        assert_eq!(
            err,
            GeometryError::TooFewVertices {
                required: 4,
                found: 3
            }
        );
    }

    #[test]
    fn test_drawn_polygon_needs_three_vertices() {
        assert!(
            SearchPolygon::from_vertices(vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)])
                .is_err()
        );
        let polygon = SearchPolygon::from_vertices(vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 1.0),
            LatLng::new(1.0, 1.0),
        ])
        .unwrap();
        assert_eq!(polygon.ring().len(), 4);
        assert_eq!(polygon.to_wkt(), "POLYGON((0 0, 1 0, 1 1, 0 0))");
    }

    #[test]
    fn test_non_finite_vertices_rejected() {
        let result = SearchPolygon::from_vertices(vec![
            LatLng::new(f64::NAN, 0.0),
            LatLng::new(0.0, 1.0),
            LatLng::new(1.0, 1.0),
        ]);
        assert!(matches!(result, Err(GeometryError::InvalidCoordinate(_))));
    }

    #[test]
    fn test_vertex_edits() {
        let mut polygon = SearchPolygon::from_vertices(vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 1.0),
            LatLng::new(1.0, 1.0),
        ])
        .unwrap();
        polygon.set_vertex(2, LatLng::new(2.0, 2.0)).unwrap();
        polygon.insert_vertex(3, LatLng::new(1.0, 0.0)).unwrap();
        assert_eq!(polygon.vertices().len(), 4);
        assert!(polygon.set_vertex(9, LatLng::new(0.0, 0.0)).is_err());
        assert_eq!(polygon.viewport().high, LatLng::new(2.0, 2.0));
    }

    #[test]
    fn test_route_endpoints() {
        let mut endpoints = RouteEndpoints::default();
        assert!(endpoints.both().is_none());
        endpoints.origin = Some(LatLng::new(1.0, 1.0));
        assert!(endpoints.both().is_none());
        endpoints.destination = Some(LatLng::new(2.0, 2.0));
        assert!(endpoints.both().is_some());
    }
}
