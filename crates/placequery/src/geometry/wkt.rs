//! The one WKT dialect this crate speaks: `POLYGON((lng lat, ...))`.
//!
//! Parsing is permissive: the keyword is case-insensitive,
//! whitespace before the parenthesis group is optional, and coordinates may be
//! separated by any run of whitespace.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{GeometryError, Result};
use placequery_warehouse::LatLng;

static POLYGON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)POLYGON\s*\(\((.*)\)\)").expect("valid polygon regex"));

/// Parse a WKT polygon into its outer ring of `[lng, lat]` pairs, exactly as written.
pub fn parse_polygon_ring(wkt: &str) -> Result<Vec<[f64; 2]>> {
    let body = POLYGON_RE
        .captures(wkt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| GeometryError::InvalidWkt(truncate(wkt)))?;

    // Only the outer ring; holes are not part of the dialect.
    let outer = body.split("),").next().unwrap_or(body);

    outer
        .split(',')
        .map(|pair| {
            let mut parts = pair.split_whitespace();
            let lng = parts.next().and_then(|s| s.trim_matches('(').parse::<f64>().ok());
            let lat = parts.next().and_then(|s| s.trim_matches(')').parse::<f64>().ok());
            match (lng, lat) {
                (Some(lng), Some(lat)) if lng.is_finite() && lat.is_finite() => Ok([lng, lat]),
                _ => Err(GeometryError::InvalidCoordinate(pair.trim().to_string())),
            }
        })
        .collect()
}

/// Render vertices as `POLYGON((lng lat, ...))`, closing the ring if needed.
pub fn polygon_wkt(vertices: &[LatLng]) -> String {
    let ring = close_ring(vertices);
    format!(
        "POLYGON(({}))",
        ring.iter().map(|p| format!("{} {}", p.lng, p.lat)).join(", ")
    )
}

/// Copy of `vertices` whose last element equals the first.
pub fn close_ring(vertices: &[LatLng]) -> Vec<LatLng> {
    let mut ring = vertices.to_vec();
    if let (Some(first), Some(last)) = (vertices.first(), vertices.last())
        && first != last
    {
        ring.push(*first);
    }
    ring
}

fn truncate(s: &str) -> String {
    const MAX: usize = 64;
    if s.chars().count() > MAX {
        format!("{}...", s.chars().take(MAX).collect::<String>())
    } else {
        s.to_string()
    }
}
